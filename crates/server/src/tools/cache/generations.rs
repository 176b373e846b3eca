//! cache_generations tool implementation.

use gencache_client::{Fetcher, ServiceWorker};
use gencache_core::CacheStore;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// One generation held by the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub id: String,
    pub entries: u64,
    /// True for the generation routing requests.
    pub current: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationsOutput {
    /// Configured generation identifier.
    pub configured: String,
    pub controlling: Option<String>,
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl<S: CacheStore, F: Fetcher>(
    worker: &ServiceWorker<S, F>,
) -> Result<CallToolResult, McpError> {
    let controlling = worker.controlling().await;
    let mut generations = Vec::new();

    for id in worker.store().list_generations().await? {
        let entries = worker.store().entry_count(&id).await?;
        let current = controlling.as_deref() == Some(id.as_str());
        generations.push(GenerationInfo { id, entries, current });
    }

    json_result(&GenerationsOutput {
        configured: worker.config().generation_id.clone(),
        controlling,
        generations,
    })
}
