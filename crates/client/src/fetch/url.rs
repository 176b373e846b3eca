//! URL canonicalization for consistent cache keys.
//!
//! Intercepted requests arrive as paths relative to the application origin.
//! Both the origin and the resolved URLs are normalized the same way so that
//! equal requests always produce equal keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("path must start with '/': {0}")]
    RelativePath(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an application origin.
///
/// Only http and https are accepted. Path, query and fragment are dropped;
/// the result always ends in `/`.
pub fn canonicalize_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Resolve a request path (with optional query) against the origin.
///
/// The fragment is removed since it never reaches the server. The query is
/// kept verbatim and is part of the request identity.
pub fn resolve(origin: &Url, path: &str) -> Result<Url, UrlError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(UrlError::Empty);
    }
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(UrlError::RelativePath(path.to_string()));
    }

    let mut url = origin.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    url.set_fragment(None);
    Ok(url)
}
