//! cache_install and cache_activate tool implementations.
//!
//! Let the host re-run the lifecycle after a failed startup install, or after
//! the origin's seed assets became reachable again.

use gencache_client::{Fetcher, Lifecycle, ServiceWorker};
use gencache_core::CacheStore;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the cache_install tool.
pub async fn install_impl<S: CacheStore, F: Fetcher>(worker: &ServiceWorker<S, F>) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    json_result(&report)
}

/// Implementation of the cache_activate tool.
pub async fn activate_impl<S: CacheStore, F: Fetcher>(
    worker: &ServiceWorker<S, F>,
) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    json_result(&report)
}
