//! Type relation lookup backed by the cache.

use crate::cache::{CacheStore, CompatibilityRow};
use crate::error::{LookupError, LookupResult};
use crate::provider::{DataProvider, ProviderError};
use futures::future::join_all;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The full fixed space of type ids.
pub const CATEGORY_IDS: RangeInclusive<u32> = 1..=20;

/// Resolves type rows from the cache, falling back to the provider.
#[derive(Clone)]
pub struct CompatibilityResolver {
    cache: Arc<CacheStore>,
    provider: Arc<dyn DataProvider>,
}

impl CompatibilityResolver {
    pub fn new(cache: Arc<CacheStore>, provider: Arc<dyn DataProvider>) -> Self {
        Self { cache, provider }
    }

    /// The cached row for a type id or name. Never suspends; `None` means
    /// not known yet.
    pub fn resolve(&self, category: &str) -> Option<CompatibilityRow> {
        self.cache.relation(category)
    }

    /// Like [`CompatibilityResolver::resolve`], but a missing row is an error.
    pub fn require(&self, category: &str) -> LookupResult<CompatibilityRow> {
        self.resolve(category)
            .ok_or_else(|| LookupError::UnresolvedAttribute(category.to_string()))
    }

    /// Fetch a type's row and store it under both its id and its name.
    pub async fn fetch(&self, category_id: u32) -> Result<CompatibilityRow, ProviderError> {
        let relations = self.provider.fetch_category_relations(category_id).await?;
        let id_key = category_id.to_string();
        self.cache
            .put_relation(&[id_key.as_str(), relations.name.as_str()], relations.row.clone())
            .await;
        debug!(category_id, name = %relations.name, "fetched type relations");
        Ok(relations.row)
    }

    /// Fetch every id in `ids` that is not cached yet, concurrently.
    ///
    /// Failures are logged and leave the type unresolved. Returns the number
    /// of rows fetched.
    pub async fn prefetch(&self, ids: RangeInclusive<u32>) -> usize {
        let missing: Vec<u32> = ids
            .filter(|id| !self.cache.has_relation(&id.to_string()))
            .collect();

        if missing.is_empty() {
            debug!("all type relations cached");
            return 0;
        }

        let results = join_all(missing.iter().map(|&id| async move {
            let result = self.fetch(id).await;
            if let Err(e) = &result {
                warn!(category_id = id, error = %e, "failed to fetch type relations");
            }
            result
        }))
        .await;

        let fetched = results.iter().filter(|r| r.is_ok()).count();
        info!(fetched, requested = missing.len(), "prefetched type relations");
        fetched
    }
}
