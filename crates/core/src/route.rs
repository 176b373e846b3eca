//! Route classification.
//!
//! Maps a request's method and path to the caching policy it receives. The
//! prefix tables are fixed; they are not runtime configuration.

use serde::{Deserialize, Serialize};

/// Path prefixes that are never intercepted.
pub const BYPASS_PREFIXES: &[&str] = &["/admin", "/api", "/login", "/register"];

/// Prefix for long-lived static assets.
pub const STATIC_PREFIX: &str = "/static/";

/// Prefix for article pages.
pub const ARTICLE_PREFIX: &str = "/article/";

/// Caching policy bucket for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Not intercepted; always network-direct.
    Bypass,
    /// Served from cache when present, never revalidated.
    StaticAsset,
    /// Served stale from cache and revalidated in the background.
    DynamicPage,
    /// Served from cache when present, never persisted from the network.
    Unclassified,
}

impl RouteClass {
    /// Whether this class may read or write the cache store at all.
    pub fn is_cacheable(self) -> bool {
        !matches!(self, RouteClass::Bypass)
    }
}

/// Classify a request by method and path.
///
/// Precedence: non-GET, then bypass prefixes, then `/static/`, then the root
/// page and articles. Everything else is unclassified.
pub fn classify(method: &str, path: &str) -> RouteClass {
    if method != "GET" {
        return RouteClass::Bypass;
    }

    if BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return RouteClass::Bypass;
    }

    if path.starts_with(STATIC_PREFIX) {
        return RouteClass::StaticAsset;
    }

    if path == "/" || path.starts_with(ARTICLE_PREFIX) {
        return RouteClass::DynamicPage;
    }

    RouteClass::Unclassified
}
