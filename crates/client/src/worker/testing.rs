//! Test doubles for the worker: a scripted fetcher and an operation-counting store.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gencache_core::{CacheEntry, CacheKey, CacheStore, Error, MemoryStore};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

pub(crate) const ORIGIN: &str = "http://localhost:8000";

pub(crate) fn origin_url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn status_response(status: u16, body: &str) -> FetchResponse {
    let url = origin_url("/");
    FetchResponse {
        url: url.clone(),
        final_url: url,
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        bytes: Bytes::from(body.to_string()),
        fetch_ms: 1,
    }
}

pub(crate) fn ok_response(content_type: &str, body: &str) -> FetchResponse {
    let mut response = status_response(200, body);
    response.headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    response
}

pub(crate) fn entry(body: &str) -> CacheEntry {
    CacheEntry { status: 200, status_text: "OK".into(), headers: BTreeMap::new(), body: body.as_bytes().to_vec() }
}

/// Fetcher answering from a per-URL script. Unscripted URLs fail.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    script: Mutex<HashMap<Url, Option<FetchResponse>>>,
    calls: Mutex<Vec<Url>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &Url, response: FetchResponse) {
        self.script.lock().unwrap().insert(url.clone(), Some(response));
    }

    pub(crate) fn fail(&self, url: &Url) {
        self.script.lock().unwrap().insert(url.clone(), None);
    }

    pub(crate) fn urls(&self) -> Vec<Url> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        let scripted = self.script.lock().unwrap().get(&request.url).cloned().flatten();
        match scripted {
            Some(mut response) => {
                response.url = request.url.clone();
                response.final_url = request.url.clone();
                Ok(response)
            }
            None => Err(Error::Network(format!("connection refused: {}", request.url))),
        }
    }
}

/// MemoryStore wrapper counting every operation.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    lookups: AtomicUsize,
    puts: AtomicUsize,
    other: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn total(&self) -> usize {
        self.lookups() + self.puts() + self.other.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.lookups.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
        self.other.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.other.fetch_add(1, Ordering::SeqCst);
        self.inner.open(generation).await
    }

    async fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(generation, key).await
    }

    async fn put(&self, generation: &str, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(generation, key, entry).await
    }

    async fn put_all(&self, generation: &str, entries: &[(CacheKey, CacheEntry)]) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_all(generation, entries).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.other.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(generation).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.other.fetch_add(1, Ordering::SeqCst);
        self.inner.list_generations().await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.other.fetch_add(1, Ordering::SeqCst);
        self.inner.entry_count(generation).await
    }

    async fn purge_expired(&self, generation: &str, now_ms: i64) -> Result<u64, Error> {
        self.other.fetch_add(1, Ordering::SeqCst);
        self.inner.purge_expired(generation, now_ms).await
    }
}

/// MemoryStore wrapper whose reads and writes can be switched to fail.
#[derive(Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_attempts: AtomicUsize,
}

impl FailingStore {
    pub(crate) fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn write(&self) -> Result<(), Error> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        Ok(())
    }

    fn read(&self) -> Result<(), Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.write()?;
        self.inner.open(generation).await
    }

    async fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        self.read()?;
        self.inner.lookup(generation, key).await
    }

    async fn put(&self, generation: &str, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        self.write()?;
        self.inner.put(generation, key, entry).await
    }

    async fn put_all(&self, generation: &str, entries: &[(CacheKey, CacheEntry)]) -> Result<(), Error> {
        self.write()?;
        self.inner.put_all(generation, entries).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.write()?;
        self.inner.delete(generation).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.read()?;
        self.inner.list_generations().await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.read()?;
        self.inner.entry_count(generation).await
    }

    async fn purge_expired(&self, generation: &str, now_ms: i64) -> Result<u64, Error> {
        self.write()?;
        self.inner.purge_expired(generation, now_ms).await
    }
}

/// Poll `check` until it holds, letting detached tasks run in between.
pub(crate) async fn eventually<Fut>(mut check: impl FnMut() -> Fut)
where
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}
