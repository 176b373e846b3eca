//! site_fetch tool implementation.
//!
//! Routes one request through the cache worker, acting as the host: when the
//! worker passes a request through, the tool performs the live fetch itself.

use gencache_client::{FetchRequest, Fetcher, Interception, Method, ServiceWorker, header};
use gencache_core::{CacheStore, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{EntryOutput, json_result};
use crate::error::ToolError;

/// Input parameters for the site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchParams {
    /// Path on the application origin, with optional query (e.g. "/article/btc?page=2").
    pub path: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional Accept header, e.g. "text/html".
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for site_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteFetchOutput {
    /// Absolute URL requested.
    pub url: String,
    /// "cache", "network", "fallback" or "pass_through".
    pub source: String,
    pub response: EntryOutput,
}

/// Implementation of the site_fetch tool.
pub async fn fetch_impl<S, F>(worker: &ServiceWorker<S, F>, params: SiteFetchParams) -> Result<CallToolResult, McpError>
where
    S: CacheStore,
    F: Fetcher,
{
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidMethod(params.method.clone()))?;
    let url = worker.config().url_for(&params.path)?;

    let mut request = FetchRequest::new(method, url.clone());
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header(header::ACCEPT, accept);
    }

    let (response, source) = match worker.handle(&request).await {
        Interception::Respond { response, source } => (response, source.as_str().to_string()),
        Interception::PassThrough => {
            let response = worker.fetcher().fetch(&request).await?;
            (response.to_entry(), "pass_through".to_string())
        }
        Interception::NoResponse => return Err(Error::NoResponse.into()),
    };

    json_result(&SiteFetchOutput { url: url.to_string(), source, response: EntryOutput::from(&response) })
}
