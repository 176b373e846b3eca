//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker-backed implementations.
use std::sync::Arc;

use gencache_client::{FetchClient, ServiceWorker};
use gencache_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CacheGetParams, CachePurgeParams, generations_impl, get_impl, purge_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use crate::tools::site_fetch::{SiteFetchParams, fetch_impl};

/// Worker type served over MCP: SQLite-backed store, reqwest fetcher.
pub type SiteWorker = ServiceWorker<CacheDb, FetchClient>;

/// The main MCP server handler for gencache.
#[derive(Clone)]
pub struct GenCacheServer {
    worker: Arc<SiteWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl GenCacheServer {
    /// Create a new server handler around an already constructed worker.
    pub fn new(worker: Arc<SiteWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Request a path on the application origin through the cache worker. Reports whether the response came from the cache, the network, the root fallback, or a live pass-through."
    )]
    async fn site_fetch(&self, params: Parameters<SiteFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.worker.as_ref(), params.0).await
    }

    #[tool(description = "Fetch every seed path and commit them into the configured cache generation (all or nothing).")]
    async fn cache_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(self.worker.as_ref()).await
    }

    #[tool(description = "Activate the installed generation: delete every other generation and start routing requests.")]
    async fn cache_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(self.worker.as_ref()).await
    }

    #[tool(description = "List cache generations with entry counts and which one is controlling.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(self.worker.as_ref()).await
    }

    /// Read a stored response without touching the network.
    #[tool(description = "Retrieve the stored GET response for a path from the controlling generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.as_ref(), params.0).await
    }

    #[tool(description = "Delete a non-controlling generation, or expired page entries of the controlling one.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.worker.as_ref(), params.0).await
    }
}

impl ServerHandler for GenCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "gencache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
