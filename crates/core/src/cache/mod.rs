//! Generation-partitioned response cache.
//!
//! A generation is a versioned snapshot of cached responses. Rollover
//! replaces one generation wholesale with another; individual entries have
//! no lifecycle of their own apart from the optional page expiry.
//!
//! - [`CacheStore`] is the storage interface the worker consumes
//! - [`CacheDb`] persists generations in SQLite (WAL mode, versioned migrations)
//! - [`MemoryStore`] keeps them in process memory

pub mod connection;
pub mod entries;
pub mod entry;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CacheEntry, CacheKey, EXPIRE_HEADER, PAGE_TTL_MS};
pub use memory::MemoryStore;
pub use store::CacheStore;
