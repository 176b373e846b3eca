//! Generation installation.
//!
//! Seeds are fetched in order and staged in memory. Only when every seed
//! has succeeded is the batch committed, in one store transaction. A failed
//! install leaves no entries behind for the new generation, so whatever
//! generation was routing before keeps serving.

use gencache_core::{CacheEntry, CacheKey, CacheStore, Error};
use serde::Serialize;
use url::Url;

use crate::fetch::{FetchRequest, Fetcher};

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    /// Distinct entries committed.
    pub entries: usize,
    /// The generation may take over without waiting for older sessions.
    pub ready: bool,
}

/// Fetch every seed and commit them as `generation`.
///
/// A seed counts as failed on a transport error or a non-2xx status.
/// Re-running with the same inputs upserts the same keys, leaving an
/// identical entry set.
pub async fn install<S, F>(store: &S, fetcher: &F, generation: &str, seeds: &[Url]) -> Result<InstallReport, Error>
where
    S: CacheStore + ?Sized,
    F: Fetcher + ?Sized,
{
    let mut staged: Vec<(CacheKey, CacheEntry)> = Vec::with_capacity(seeds.len());

    for url in seeds {
        let response = fetcher
            .fetch(&FetchRequest::get(url.clone()))
            .await
            .map_err(|e| Error::SeedFetchFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.status.is_success() {
            return Err(Error::SeedFetchFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }

        let key = CacheKey::get(url);
        staged.retain(|(existing, _)| existing != &key);
        staged.push((key, response.to_entry()));
    }

    store.put_all(generation, &staged).await?;

    tracing::info!(generation = %generation, entries = staged.len(), "installed cache generation");

    Ok(InstallReport { generation: generation.to_string(), entries: staged.len(), ready: true })
}
