//! Generation reaping on activation.

use gencache_core::{CacheStore, Error};
use serde::Serialize;

/// Outcome of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub generation: String,
    /// Generations deleted during the rollover.
    pub removed: Vec<String>,
}

/// Delete every generation except `current`.
///
/// Returns the identifiers that were removed. After success the store holds
/// at most the `current` generation.
pub async fn reap<S: CacheStore + ?Sized>(store: &S, current: &str) -> Result<Vec<String>, Error> {
    let mut removed = Vec::new();

    for generation in store.list_generations().await? {
        if generation == current {
            continue;
        }
        tracing::info!(generation = %generation, current = %current, "deleting old cache generation");
        if store.delete(&generation).await? {
            removed.push(generation);
        }
    }

    Ok(removed)
}
