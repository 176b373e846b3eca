//! gencache server entry point.
//!
//! Boots the cache worker, runs its install and activate lifecycle, then
//! serves the MCP tools on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use gencache_client::{FetchClient, FetchConfig, Lifecycle, ServiceWorker, WorkerConfig};
use gencache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation_id,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting gencache server on stdio transport"
    );

    let store = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..Default::default()
    })?;
    let worker = Arc::new(ServiceWorker::new(
        Arc::new(store),
        Arc::new(fetcher),
        WorkerConfig::from_app_config(&config)?,
    ));

    match worker.on_install().await {
        Ok(report) => {
            tracing::info!(generation = %report.generation, entries = report.entries, "install complete");
            if let Err(e) = worker.on_activate().await {
                tracing::warn!(error = %e, "activation failed, requests will pass through");
            }
        }
        Err(e) => tracing::warn!(error = %e, "install failed, requests will pass through"),
    }

    let handler = handler::GenCacheServer::new(worker);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
