//! Core types and shared functionality for gencache.
//!
//! This crate provides:
//! - Route classification for intercepted requests
//! - The generation-partitioned cache store (SQLite and in-memory)
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod route;

pub use cache::{CacheDb, CacheEntry, CacheKey, CacheStore, EXPIRE_HEADER, MemoryStore, PAGE_TTL_MS};
pub use config::AppConfig;
pub use error::Error;
pub use route::{RouteClass, classify};
