//! Request-intercepting cache worker.
//!
//! ### Lifecycle
//! - `on_install`: fetch every seed path and commit them as one generation.
//!   The new generation is ready immediately; nothing waits for sessions
//!   still using an older one.
//! - `on_activate`: delete every other generation, then route all current
//!   and future requests through this one.
//! - `on_intercept`: per-request cache decision (see [`intercept`]).
//!
//! Install and activate are serialized by a lifecycle lock, and activation
//! is refused until install has succeeded for the configured generation.

pub mod install;
pub mod intercept;
pub mod reaper;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use gencache_core::{AppConfig, CacheEntry, CacheKey, CacheStore, Error};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::fetch::{FetchRequest, Fetcher, canonicalize_origin, resolve};

pub use install::{InstallReport, install};
pub use intercept::{Interception, ResponseSource};
pub use reaper::{ActivationReport, reap};

/// Worker configuration, fixed for the lifetime of a [`ServiceWorker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Generation this worker installs and routes through.
    pub generation_id: String,
    /// Application origin, canonicalized.
    pub origin: Url,
    /// Paths stored at install time, in order.
    pub seed_paths: Vec<String>,
    /// Treat page entries past their expiry stamp as misses.
    pub honor_page_expiry: bool,
}

impl WorkerConfig {
    pub fn new(generation_id: impl Into<String>, origin: &str, seed_paths: Vec<String>) -> Result<Self, Error> {
        let origin = canonicalize_origin(origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { generation_id: generation_id.into(), origin, seed_paths, honor_page_expiry: true })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let mut worker = Self::new(&config.generation_id, &config.origin, config.seed_paths.clone())?;
        worker.honor_page_expiry = config.honor_page_expiry;
        Ok(worker)
    }

    /// Resolve a request path against the origin.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.origin, path).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    /// Seed paths resolved to absolute URLs.
    pub fn seed_urls(&self) -> Result<Vec<Url>, Error> {
        self.seed_paths.iter().map(|path| self.url_for(path)).collect()
    }
}

/// Host runtime contract.
///
/// The host calls `on_install` once, then `on_activate` once, then
/// `on_intercept` for every outgoing request.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<ActivationReport, Error>;

    async fn on_intercept(&self, request: FetchRequest) -> Interception;
}

#[derive(Debug, Default)]
struct RoutingState {
    /// Install completed for the configured generation.
    installed: bool,
    /// Generation requests are currently routed through.
    controlling: Option<String>,
}

/// The cache worker: owns the store and fetcher handles and the routing state.
pub struct ServiceWorker<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    config: Arc<WorkerConfig>,
    routing: RwLock<RoutingState>,
    lifecycle: Mutex<()>,
}

impl<S: CacheStore, F: Fetcher> ServiceWorker<S, F> {
    pub fn new(store: Arc<S>, fetcher: Arc<F>, config: WorkerConfig) -> Self {
        Self {
            store,
            fetcher,
            config: Arc::new(config),
            routing: RwLock::new(RoutingState::default()),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Generation currently routing requests, if activation has happened.
    pub async fn controlling(&self) -> Option<String> {
        self.routing.read().await.controlling.clone()
    }

    /// Look up the GET entry for `path` in the controlling generation.
    pub async fn cached(&self, path: &str) -> Result<Option<CacheEntry>, Error> {
        let Some(generation) = self.controlling().await else {
            return Ok(None);
        };
        let key = CacheKey::get(&self.config.url_for(path)?);
        self.store.lookup(&generation, &key).await
    }
}

#[async_trait]
impl<S: CacheStore, F: Fetcher> Lifecycle for ServiceWorker<S, F> {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        let _guard = self.lifecycle.lock().await;
        let seeds = self.config.seed_urls()?;
        let report = install(self.store.as_ref(), self.fetcher.as_ref(), &self.config.generation_id, &seeds).await?;
        self.routing.write().await.installed = true;
        Ok(report)
    }

    async fn on_activate(&self) -> Result<ActivationReport, Error> {
        let _guard = self.lifecycle.lock().await;
        let generation = self.config.generation_id.clone();
        if !self.routing.read().await.installed {
            return Err(Error::NotInstalled(generation));
        }
        if !self.store.list_generations().await?.contains(&generation) {
            tracing::warn!(generation = %generation, "installed generation missing from store");
            self.routing.write().await.installed = false;
            return Err(Error::NotInstalled(generation));
        }

        let removed = reap(self.store.as_ref(), &generation).await?;

        self.routing.write().await.controlling = Some(generation.clone());
        tracing::info!(generation = %generation, removed = removed.len(), "worker activated; routing claimed");

        Ok(ActivationReport { generation, removed })
    }

    async fn on_intercept(&self, request: FetchRequest) -> Interception {
        self.handle(&request).await
    }
}
