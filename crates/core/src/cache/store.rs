//! Generation-partitioned cache store interface.
//!
//! Single-entry reads and writes are atomic: a reader racing a writer sees
//! either the old or the new entry. There are no cross-entry guarantees
//! except for [`CacheStore::put_all`], which commits a batch as one unit.

use async_trait::async_trait;

use super::entry::{CacheEntry, CacheKey};
use crate::Error;

/// Storage backend for cache generations.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Look up an entry within a generation.
    async fn lookup(&self, generation: &str, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    /// Insert or replace an entry, opening the generation if needed.
    async fn put(&self, generation: &str, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error>;

    /// Insert or replace a batch of entries atomically.
    async fn put_all(&self, generation: &str, entries: &[(CacheKey, CacheEntry)]) -> Result<(), Error>;

    /// Delete a generation and all its entries.
    ///
    /// Returns whether the generation existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// All generation identifiers currently present, sorted.
    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    /// Number of entries held by a generation.
    async fn entry_count(&self, generation: &str) -> Result<u64, Error>;

    /// Delete entries of a generation whose expiry is at or before `now_ms`.
    ///
    /// Returns the number of deleted entries.
    async fn purge_expired(&self, generation: &str, now_ms: i64) -> Result<u64, Error>;
}
