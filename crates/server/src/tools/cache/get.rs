//! cache_get tool implementation.
//!
//! Reads a stored GET response from the controlling generation without
//! touching the network.

use gencache_client::{Fetcher, ServiceWorker};
use gencache_core::{CacheStore, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{EntryOutput, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Path on the application origin, e.g. "/static/app.js".
    pub path: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<S: CacheStore, F: Fetcher>(
    worker: &ServiceWorker<S, F>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let entry = worker
        .cached(&params.path)
        .await?
        .ok_or_else(|| Error::CacheMiss(params.path.clone()))?;

    json_result(&EntryOutput::from(&entry))
}
