//! Structured errors for tool argument handling in the gencache server.
//!
//! Cache and lifecycle failures use `gencache_core::Error`; these cover what
//! goes wrong before a request ever reaches the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Tool-layer errors for the gencache server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Method is not a valid HTTP token.
    #[error("INVALID_METHOD: {0}")]
    InvalidMethod(String),

    /// Tool output could not be serialized.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidMethod(msg) => (-32602, msg.clone()),
            ToolError::Serialize(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
