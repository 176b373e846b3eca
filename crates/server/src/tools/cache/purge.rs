//! cache_purge tool implementation.
//!
//! Drops a whole non-current generation, or the expired page entries of the
//! controlling one.

use gencache_client::{Fetcher, ServiceWorker};
use gencache_core::{CacheStore, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this generation. Must not be the configured (current) generation.
    #[serde(default)]
    pub generation: Option<String>,

    /// Delete expired page entries from the controlling generation.
    #[serde(default)]
    pub expired: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of generations plus entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl<S: CacheStore, F: Fetcher>(
    worker: &ServiceWorker<S, F>, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if params.generation.is_none() && !params.expired {
        return Err(Error::InvalidInput("At least one of generation or expired must be specified".into()).into());
    }

    let controlling = worker.controlling().await;
    let mut deleted = 0u64;

    if let Some(generation) = params.generation.as_deref() {
        // Controlling or merely installed, the configured generation stays.
        if generation == worker.config().generation_id {
            return Err(Error::InvalidInput(format!("generation {generation} is current and cannot be purged")).into());
        }
        if worker.store().delete(generation).await? {
            tracing::info!(generation = %generation, "purged cache generation");
            deleted += 1;
        }
    }

    if params.expired
        && let Some(current) = controlling.as_deref()
    {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let purged = worker.store().purge_expired(current, now_ms).await?;
        tracing::debug!(generation = %current, purged, "purged expired entries");
        deleted += purged;
    }

    json_result(&CachePurgeOutput { deleted })
}
