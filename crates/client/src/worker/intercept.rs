//! Per-request cache decisions.
//!
//! ### Decision order
//! 1. Classify by method and path. Bypass routes, and every request before
//!    activation, pass through untouched.
//! 2. Cache hit:
//!    - static asset: serve it, no network
//!    - HTML (page route or `Accept: text/html`): serve it, then refresh it
//!      in a detached task (stale-while-revalidate)
//!    - anything else: serve it
//! 3. Cache miss: fetch. On success serve the network response and persist
//!    it in a detached task. On failure, HTML requests fall back to the
//!    cached root page; everything else gets no response.
//!
//! Detached tasks are never awaited or cancelled; their failures are logged
//! and dropped.

use std::sync::Arc;

use gencache_core::{CacheEntry, CacheKey, CacheStore, PAGE_TTL_MS, RouteClass, classify};
use serde::Serialize;

use super::ServiceWorker;
use crate::fetch::{FetchRequest, Fetcher};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached root page served because the network failed.
    Fallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Answer the request with this response.
    Respond { response: CacheEntry, source: ResponseSource },
    /// Not intercepted; the host sends the request to the network itself.
    PassThrough,
    /// Intercepted, but there is nothing to answer with.
    NoResponse,
}

impl Interception {
    fn cached(response: CacheEntry) -> Self {
        Interception::Respond { response, source: ResponseSource::Cache }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Entry to persist for a successful network response, if any.
///
/// Only 200 responses are stored. Pages get an expiry stamp; unclassified
/// routes are never stored.
fn persistable(class: RouteClass, entry: &CacheEntry, now_ms: i64) -> Option<CacheEntry> {
    if entry.status != 200 {
        return None;
    }
    match class {
        RouteClass::StaticAsset => Some(entry.clone()),
        RouteClass::DynamicPage => Some(entry.with_expiry(now_ms + PAGE_TTL_MS)),
        RouteClass::Unclassified | RouteClass::Bypass => None,
    }
}

async fn persist<S: CacheStore + ?Sized>(store: &S, generation: &str, key: &CacheKey, entry: &CacheEntry) {
    match store.put(generation, key, entry).await {
        Ok(()) => tracing::debug!(key = %key, "stored response"),
        Err(e) => tracing::warn!(key = %key, error = %e, "failed to store response"),
    }
}

impl<S: CacheStore, F: Fetcher> ServiceWorker<S, F> {
    /// Decide how to answer an intercepted request.
    ///
    /// Never fails: fetch errors are recovered here or reported as
    /// [`Interception::NoResponse`].
    pub async fn handle(&self, request: &FetchRequest) -> Interception {
        let class = classify(request.method.as_str(), request.url.path());
        if !class.is_cacheable() {
            tracing::debug!(method = %request.method, url = %request.url, "bypass");
            return Interception::PassThrough;
        }

        let Some(generation) = self.controlling().await else {
            tracing::debug!(url = %request.url, "not controlling yet; pass through");
            return Interception::PassThrough;
        };

        let key = CacheKey::new(request.method.as_str(), &request.url);
        let negotiates_html = class == RouteClass::DynamicPage || request.accepts_html();

        let cached = match self.store.lookup(&generation, &key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed; treating as miss");
                None
            }
        };
        let cached = cached.filter(|entry| !(self.config.honor_page_expiry && entry.is_expired_at(now_ms())));

        if let Some(entry) = cached {
            if class != RouteClass::StaticAsset && negotiates_html {
                self.spawn_revalidation(generation, key, class, request.clone());
            }
            tracing::debug!(url = %request.url, ?class, "cache hit");
            return Interception::cached(entry);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let entry = response.to_entry();
                self.spawn_persist(generation, key, class, &entry);
                Interception::Respond { response: entry, source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "fetch failed");
                if negotiates_html {
                    self.root_fallback(&generation).await
                } else {
                    Interception::NoResponse
                }
            }
        }
    }

    async fn root_fallback(&self, generation: &str) -> Interception {
        let root = CacheKey::get(&self.config.origin);
        match self.store.lookup(generation, &root).await {
            Ok(Some(response)) => Interception::Respond { response, source: ResponseSource::Fallback },
            Ok(None) => Interception::NoResponse,
            Err(e) => {
                tracing::warn!(error = %e, "root fallback lookup failed");
                Interception::NoResponse
            }
        }
    }

    /// Store a network response without delaying the caller.
    fn spawn_persist(&self, generation: String, key: CacheKey, class: RouteClass, entry: &CacheEntry) {
        let Some(stored) = persistable(class, entry, now_ms()) else {
            return;
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            persist(store.as_ref(), &generation, &key, &stored).await;
        });
    }

    /// Refresh a served entry in the background. Fire-and-forget.
    fn spawn_revalidation(&self, generation: String, key: CacheKey, class: RouteClass, request: FetchRequest) {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            let response = match fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "revalidation failed");
                    return;
                }
            };
            if let Some(stored) = persistable(class, &response.to_entry(), now_ms()) {
                persist(store.as_ref(), &generation, &key, &stored).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{
        CountingStore, FailingStore, ScriptedFetcher, entry, eventually, ok_response, origin_url, status_response,
    };
    use crate::worker::{Lifecycle, WorkerConfig};
    use gencache_core::{EXPIRE_HEADER, MemoryStore};
    use reqwest::Method;
    use reqwest::header::ACCEPT;

    const GEN: &str = "blockwire-v1";

    async fn active_worker<S: CacheStore>(store: S, fetcher: ScriptedFetcher) -> ServiceWorker<S, ScriptedFetcher> {
        let config = WorkerConfig::new(GEN, "http://localhost:8000", Vec::new()).unwrap();
        let worker = ServiceWorker::new(Arc::new(store), Arc::new(fetcher), config);
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        worker
    }

    fn get(path: &str) -> FetchRequest {
        FetchRequest::get(origin_url(path))
    }

    fn get_html(path: &str) -> FetchRequest {
        get(path).with_header(ACCEPT, "text/html,application/xhtml+xml")
    }

    #[test]
    fn test_persistable_policy() {
        let ok = entry("x");
        assert_eq!(persistable(RouteClass::StaticAsset, &ok, 0), Some(ok.clone()));
        assert_eq!(persistable(RouteClass::DynamicPage, &ok, 1_000).unwrap().expire_at(), Some(1_000 + PAGE_TTL_MS));
        assert_eq!(persistable(RouteClass::Unclassified, &ok, 0), None);

        let not_found = CacheEntry { status: 404, ..entry("x") };
        assert_eq!(persistable(RouteClass::StaticAsset, &not_found, 0), None);
    }

    #[tokio::test]
    async fn test_non_get_never_touches_store() {
        let worker = active_worker(CountingStore::default(), ScriptedFetcher::new()).await;
        worker.store().reset();

        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let request = FetchRequest::new(method, origin_url("/static/app.js"));
            assert_eq!(worker.handle(&request).await, Interception::PassThrough);
        }

        assert_eq!(worker.store().lookups(), 0);
        assert_eq!(worker.store().puts(), 0);
        assert_eq!(worker.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_bypass_prefix_never_touches_store() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/admin/reports"), ok_response("text/html", "admin"));
        let worker = active_worker(CountingStore::default(), fetcher).await;
        worker.store().reset();

        for path in ["/admin/reports", "/api/prices", "/login", "/register"] {
            assert_eq!(worker.handle(&get_html(path)).await, Interception::PassThrough);
        }

        assert_eq!(worker.store().total(), 0);
        assert_eq!(worker.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_pass_through_before_activation() {
        let config = WorkerConfig::new(GEN, "http://localhost:8000", Vec::new()).unwrap();
        let worker = ServiceWorker::new(Arc::new(CountingStore::default()), Arc::new(ScriptedFetcher::new()), config);

        assert_eq!(worker.handle(&get("/static/app.js")).await, Interception::PassThrough);
        assert_eq!(worker.store().total(), 0);
    }

    #[tokio::test]
    async fn test_static_hit_makes_no_fetch() {
        let store = MemoryStore::new();
        store.put(GEN, &CacheKey::get(&origin_url("/static/app.js")), &entry("cached js")).await.unwrap();
        let worker = active_worker(store, ScriptedFetcher::new()).await;

        let result = worker.handle(&get_html("/static/app.js")).await;
        tokio::task::yield_now().await;

        assert_eq!(result, Interception::cached(entry("cached js")));
        assert_eq!(worker.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_page_hit_serves_then_revalidates_once() {
        let store = MemoryStore::new();
        let key = CacheKey::get(&origin_url("/article/btc"));
        store.put(GEN, &key, &entry("stale")).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/article/btc"), ok_response("text/html", "fresh"));
        let worker = active_worker(store, fetcher).await;
        let (worker, key) = (&worker, &key);

        let result = worker.handle(&get("/article/btc")).await;

        assert_eq!(result, Interception::cached(entry("stale")));
        assert_eq!(worker.fetcher().calls(), 0);

        eventually(move || async move {
            worker.store().lookup(GEN, &key).await.unwrap().is_some_and(|e| e.body == b"fresh")
        })
        .await;
        assert_eq!(worker.fetcher().calls(), 1);

        let refreshed = worker.store().lookup(GEN, &key).await.unwrap().unwrap();
        assert!(refreshed.header(EXPIRE_HEADER).is_some());
    }

    #[tokio::test]
    async fn test_unclassified_html_hit_revalidates_without_storing() {
        let store = MemoryStore::new();
        let key = CacheKey::get(&origin_url("/about"));
        store.put(GEN, &key, &entry("about v1")).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/about"), ok_response("text/html", "about v2"));
        let worker = active_worker(store, fetcher).await;
        let (worker, key) = (&worker, &key);

        assert_eq!(worker.handle(&get_html("/about")).await, Interception::cached(entry("about v1")));

        eventually(move || async move { worker.fetcher().calls() == 1 }).await;
        tokio::task::yield_now().await;
        assert_eq!(worker.store().lookup(GEN, &key).await.unwrap().unwrap().body, b"about v1");
    }

    #[tokio::test]
    async fn test_unclassified_non_html_hit_serves_without_fetch() {
        let store = MemoryStore::new();
        store.put(GEN, &CacheKey::get(&origin_url("/feed.json")), &entry("{}")).await.unwrap();
        let worker = active_worker(store, ScriptedFetcher::new()).await;

        assert_eq!(worker.handle(&get("/feed.json")).await, Interception::cached(entry("{}")));
        tokio::task::yield_now().await;
        assert_eq!(worker.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_static_miss_fetches_and_persists() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/static/ticker_fix.css"), ok_response("text/css", "css"));
        let worker = active_worker(MemoryStore::new(), fetcher).await;
        let key = CacheKey::get(&origin_url("/static/ticker_fix.css"));
        let (worker, key) = (&worker, &key);

        match worker.handle(&get("/static/ticker_fix.css")).await {
            Interception::Respond { response, source } => {
                assert_eq!(source, ResponseSource::Network);
                assert_eq!(response.body, b"css");
            }
            other => panic!("unexpected interception: {other:?}"),
        }

        eventually(move || async move { worker.store().lookup(GEN, &key).await.unwrap().is_some() }).await;
        let stored = worker.store().lookup(GEN, &key).await.unwrap().unwrap();
        assert_eq!(stored.expire_at(), None);
    }

    #[tokio::test]
    async fn test_page_miss_persists_with_expiry() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/"), ok_response("text/html", "home"));
        let worker = active_worker(MemoryStore::new(), fetcher).await;
        let key = CacheKey::get(&origin_url("/"));
        let (worker, key) = (&worker, &key);
        let before = chrono::Utc::now().timestamp_millis();

        match worker.handle(&get("/")).await {
            Interception::Respond { response, .. } => assert!(response.header(EXPIRE_HEADER).is_none()),
            other => panic!("unexpected interception: {other:?}"),
        }

        eventually(move || async move { worker.store().lookup(GEN, &key).await.unwrap().is_some() }).await;
        let expire_at = worker.store().lookup(GEN, &key).await.unwrap().unwrap().expire_at().unwrap();
        assert!(expire_at >= before + PAGE_TTL_MS);
    }

    #[tokio::test]
    async fn test_unclassified_and_error_responses_not_persisted() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/about"), ok_response("text/html", "about"));
        fetcher.respond(&origin_url("/static/missing.js"), status_response(404, "nope"));
        let worker = active_worker(CountingStore::default(), fetcher).await;
        worker.store().reset();

        let about = worker.handle(&get("/about")).await;
        let missing = worker.handle(&get("/static/missing.js")).await;
        tokio::task::yield_now().await;

        assert!(matches!(about, Interception::Respond { source: ResponseSource::Network, .. }));
        assert!(matches!(missing, Interception::Respond { response, .. } if response.status == 404));
        assert_eq!(worker.store().puts(), 0);
    }

    #[tokio::test]
    async fn test_miss_and_failure_without_root_is_no_response() {
        let worker = active_worker(MemoryStore::new(), ScriptedFetcher::new()).await;

        assert_eq!(worker.handle(&get("/")).await, Interception::NoResponse);
        assert_eq!(worker.handle(&get("/static/app.js")).await, Interception::NoResponse);
    }

    #[tokio::test]
    async fn test_html_failure_falls_back_to_root() {
        let store = MemoryStore::new();
        store.put(GEN, &CacheKey::get(&origin_url("/")), &entry("home")).await.unwrap();
        let worker = active_worker(store, ScriptedFetcher::new()).await;

        let page = worker.handle(&get("/article/offline")).await;
        assert_eq!(page, Interception::Respond { response: entry("home"), source: ResponseSource::Fallback });

        let html = worker.handle(&get_html("/about")).await;
        assert!(matches!(html, Interception::Respond { source: ResponseSource::Fallback, .. }));

        let script = worker.handle(&get("/static/app.js")).await;
        assert_eq!(script, Interception::NoResponse);
    }

    #[tokio::test]
    async fn test_revalidation_failure_serves_stale_silently() {
        let store = MemoryStore::new();
        let key = CacheKey::get(&origin_url("/"));
        store.put(GEN, &key, &entry("stale home")).await.unwrap();
        let worker = active_worker(store, ScriptedFetcher::new()).await;
        let (worker, key) = (&worker, &key);

        assert_eq!(worker.handle(&get_html("/")).await, Interception::cached(entry("stale home")));

        eventually(move || async move { worker.fetcher().calls() == 1 }).await;
        assert_eq!(worker.store().lookup(GEN, &key).await.unwrap().unwrap(), entry("stale home"));
    }

    #[tokio::test]
    async fn test_expired_page_is_refetched() {
        let store = MemoryStore::new();
        let key = CacheKey::get(&origin_url("/article/old"));
        store.put(GEN, &key, &entry("old").with_expiry(1)).await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/article/old"), ok_response("text/html", "new"));
        let worker = active_worker(store, fetcher).await;

        let result = worker.handle(&get("/article/old")).await;

        assert!(matches!(result, Interception::Respond { source: ResponseSource::Network, response } if response.body == b"new"));
        assert_eq!(worker.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_page_served_when_expiry_ignored() {
        let store = MemoryStore::new();
        store.put(GEN, &CacheKey::get(&origin_url("/article/old")), &entry("old").with_expiry(1)).await.unwrap();
        let mut config = WorkerConfig::new(GEN, "http://localhost:8000", Vec::new()).unwrap();
        config.honor_page_expiry = false;
        let worker = ServiceWorker::new(Arc::new(store), Arc::new(ScriptedFetcher::new()), config);
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();

        let result = worker.handle(&get("/article/old")).await;

        assert!(matches!(result, Interception::Respond { source: ResponseSource::Cache, .. }));
    }

    #[tokio::test]
    async fn test_store_write_failure_keeps_network_response() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/static/app.js"), ok_response("application/javascript", "js"));
        fetcher.respond(&origin_url("/article/eth"), ok_response("text/html", "eth"));
        let worker = active_worker(FailingStore::default(), fetcher).await;
        worker.store().fail_writes();
        let before = worker.store().write_attempts();

        for (path, body) in [("/static/app.js", "js"), ("/article/eth", "eth")] {
            match worker.handle(&get(path)).await {
                Interception::Respond { response, source } => {
                    assert_eq!(source, ResponseSource::Network);
                    assert_eq!(response.status, 200);
                    assert_eq!(response.body, body.as_bytes());
                    assert_eq!(response.expire_at(), None);
                }
                other => panic!("unexpected interception: {other:?}"),
            }
        }

        let worker = &worker;
        eventually(move || async move { worker.store().write_attempts() == before + 2 }).await;
        assert_eq!(worker.store().entry_count(GEN).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_error_falls_through_to_fetch() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&origin_url("/static/app.js"), ok_response("application/javascript", "live js"));
        let store = FailingStore::default();
        let worker = active_worker(store, fetcher).await;
        worker.store().put(GEN, &CacheKey::get(&origin_url("/static/app.js")), &entry("cached js")).await.unwrap();
        worker.store().fail_reads();

        match worker.handle(&get("/static/app.js")).await {
            Interception::Respond { response, source } => {
                assert_eq!(source, ResponseSource::Network);
                assert_eq!(response.body, b"live js");
            }
            other => panic!("unexpected interception: {other:?}"),
        }
        assert_eq!(worker.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_error_during_fallback_is_no_response() {
        let worker = active_worker(FailingStore::default(), ScriptedFetcher::new()).await;
        worker.store().put(GEN, &CacheKey::get(&origin_url("/")), &entry("home")).await.unwrap();
        worker.store().fail_reads();

        assert_eq!(worker.handle(&get_html("/article/btc")).await, Interception::NoResponse);
        assert_eq!(worker.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_on_intercept_delegates_to_handle() {
        let worker = active_worker(MemoryStore::new(), ScriptedFetcher::new()).await;
        assert_eq!(worker.on_intercept(get("/api/prices")).await, Interception::PassThrough);
    }
}
