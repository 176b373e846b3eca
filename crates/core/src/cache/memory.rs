//! In-memory cache store.
//!
//! Uses a map of generations behind a tokio RwLock. Nothing survives the
//! process; useful for tests and for hosts that do not want a database file.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::entry::{CacheEntry, CacheKey};
use super::store::CacheStore;
use crate::Error;

type Generations = BTreeMap<String, HashMap<CacheKey, CacheEntry>>;

/// Volatile [`CacheStore`] implementation.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    generations: Arc<RwLock<Generations>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        generations.entry(generation.to_string()).or_default();
        Ok(())
    }

    async fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.get(generation).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, generation: &str, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.clone(), entry.clone());
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: &[(CacheKey, CacheEntry)]) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let target = generations.entry(generation.to_string()).or_default();
        for (key, entry) in entries {
            target.insert(key.clone(), entry.clone());
        }
        Ok(())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        Ok(generations.remove(generation).is_some())
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.keys().cloned().collect())
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generations = self.generations.read().await;
        Ok(generations.get(generation).map_or(0, |entries| entries.len() as u64))
    }

    async fn purge_expired(&self, generation: &str, now_ms: i64) -> Result<u64, Error> {
        let mut generations = self.generations.write().await;
        let Some(entries) = generations.get_mut(generation) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now_ms));
        Ok((before - entries.len()) as u64)
    }
}
