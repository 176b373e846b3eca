//! MCP tool implementations.
//!
//! This module contains all tools exposed by the gencache server. Tool
//! functions are generic over the store and fetcher so tests can run them
//! against an in-memory store.

pub mod cache;
pub mod lifecycle;
pub mod site_fetch;

use std::collections::BTreeMap;

use gencache_core::CacheEntry;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// A response as reported by the tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryOutput {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Expiry stamp in epoch milliseconds, for page entries.
    pub expire_at: Option<i64>,
}

impl From<&CacheEntry> for EntryOutput {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            status_text: entry.status_text.clone(),
            headers: entry.headers.clone(),
            body: String::from_utf8_lossy(&entry.body).into_owned(),
            expire_at: entry.expire_at(),
        }
    }
}

/// Serialize a tool output as a pretty JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Serialize(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
