//! Cache keys and stored response entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::hash::compute_cache_key;

/// Header-like field carrying a page entry's expiry as epoch milliseconds.
pub const EXPIRE_HEADER: &str = "sw-cache-expire";

/// Lifetime stamped onto dynamic page entries (5 minutes).
pub const PAGE_TTL_MS: i64 = 5 * 60 * 1000;

/// Normalized request identity: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    /// Build a key, upper-casing the method.
    pub fn new(method: &str, url: &Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.as_str().to_string() }
    }

    /// Key for a GET of `url`, the only method that is ever stored.
    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// SHA-256 digest used as the primary key in persistent stores.
    pub fn digest(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A stored response.
///
/// Header names are kept lower-case. Values are never mutated in place:
/// derived entries (such as a page stamped with an expiry) are new values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl CacheEntry {
    /// Copy of this entry with the expiry header set to `expire_at_ms`.
    pub fn with_expiry(&self, expire_at_ms: i64) -> Self {
        let mut headers = self.headers.clone();
        headers.insert(EXPIRE_HEADER.to_string(), expire_at_ms.to_string());
        Self { status: self.status, status_text: self.status_text.clone(), headers, body: self.body.clone() }
    }

    /// Expiry in epoch milliseconds, if this entry carries one.
    pub fn expire_at(&self) -> Option<i64> {
        self.header(EXPIRE_HEADER).and_then(|v| v.trim().parse().ok())
    }

    /// Whether the entry carries an expiry at or before `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expire_at().is_some_and(|at| at <= now_ms)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
