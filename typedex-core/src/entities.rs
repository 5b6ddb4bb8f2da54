//! Creature lookup: the roster, and lazily fetched types.

use crate::cache::{CacheStore, EntityId, EntityRecord};
use crate::error::{LookupError, LookupResult};
use crate::provider::{DataProvider, ProviderError};
use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

static DETAIL_URL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)/").expect("static regex is valid"));

type TypesFuture = Shared<BoxFuture<'static, Result<Vec<String>, ProviderError>>>;

/// The creature identifier embedded in a detail URL such as
/// `https://pokeapi.co/api/v2/pokemon/25/`.
pub fn entity_id_from_url(url: &str) -> Option<EntityId> {
    DETAIL_URL_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolves creature identifiers to records, fetching types at most once.
///
/// Concurrent lookups of the same creature share one in-flight request.
pub struct EntityResolver {
    cache: Arc<CacheStore>,
    provider: Arc<dyn DataProvider>,
    in_flight: Mutex<HashMap<EntityId, TypesFuture>>,
}

impl EntityResolver {
    pub fn new(cache: Arc<CacheStore>, provider: Arc<dyn DataProvider>) -> Self {
        Self {
            cache,
            provider,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<EntityId, TypesFuture>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached record, without fetching anything.
    pub fn cached(&self, id: EntityId) -> Option<EntityRecord> {
        self.cache.entity(id)
    }

    /// Number of type fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }

    /// Resolve a creature with its types.
    ///
    /// Types already cached are returned without suspending. A provider failure
    /// leaves the creature without types so a later call can try again.
    pub async fn resolve(&self, id: EntityId) -> LookupResult<EntityRecord> {
        let record = self.cache.entity(id).ok_or(LookupError::UnknownEntity(id))?;
        if record.has_types() {
            return Ok(record);
        }

        let future = self.types_future(id, &record.url);
        let result = future.clone().await;
        self.finish(id, &future);

        match result {
            Ok(types) => self
                .cache
                .assign_types(id, types)
                .await
                .ok_or(LookupError::UnknownEntity(id)),
            Err(e) => {
                warn!(id, name = %record.name, error = %e, "failed to fetch creature types");
                Err(e.into())
            }
        }
    }

    fn types_future(&self, id: EntityId, url: &str) -> TypesFuture {
        let mut pending = self.pending();
        if let Some(existing) = pending.get(&id) {
            debug!(id, "joining in-flight type fetch");
            return existing.clone();
        }

        let provider = Arc::clone(&self.provider);
        let url = url.to_string();
        let future = async move {
            provider
                .fetch_entity_detail(&url)
                .await
                .map(|detail| detail.types)
        }
        .boxed()
        .shared();

        pending.insert(id, future.clone());
        future
    }

    /// Drop the in-flight entry for `id` if it is still the fetch this caller
    /// awaited. A later fetch started after this one finished stays shared.
    fn finish(&self, id: EntityId, awaited: &TypesFuture) {
        let mut pending = self.pending();
        if pending.get(&id).is_some_and(|current| current.ptr_eq(awaited)) {
            pending.remove(&id);
        }
    }

    /// Populate the roster if it is empty, following pages until the last.
    ///
    /// Each page is stored as one mutation. A failed page is logged and ends
    /// the sync with whatever was stored so far. Returns the number of
    /// creatures added.
    pub async fn sync_roster(&self) -> usize {
        if self.cache.entity_count() > 0 {
            debug!(entities = self.cache.entity_count(), "using cached roster");
            return 0;
        }

        let mut added = 0;
        let mut cursor: Option<String> = None;

        loop {
            let page = match self.provider.fetch_entity_list(cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, cursor = ?cursor, "failed to fetch roster page");
                    break;
                }
            };

            let records: Vec<(EntityId, EntityRecord)> = page
                .results
                .into_iter()
                .filter_map(|summary| match entity_id_from_url(&summary.detail_url) {
                    Some(id) => Some((id, EntityRecord::new(summary.name, summary.detail_url))),
                    None => {
                        debug!(url = %summary.detail_url, "roster entry without an id");
                        None
                    }
                })
                .collect();

            added += records.len();
            self.cache.put_entities(records).await;

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(added, "synced roster");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStorage;
    use crate::testing::MockProvider;
    use futures::{pin_mut, poll};
    use std::task::Poll;

    async fn resolver(provider: Arc<MockProvider>) -> EntityResolver {
        let cache = Arc::new(CacheStore::load(Arc::new(MemoryStorage::new())).await);
        EntityResolver::new(cache, provider)
    }

    #[test]
    fn test_entity_id_from_url() {
        assert_eq!(
            entity_id_from_url("https://pokeapi.co/api/v2/pokemon/25/"),
            Some(25)
        );
        assert_eq!(
            entity_id_from_url("https://pokeapi.co/api/v2/pokemon/10001/"),
            Some(10001)
        );
        assert_eq!(entity_id_from_url("https://pokeapi.co/api/v2/pokemon/"), None);
    }

    #[tokio::test]
    async fn test_sync_roster_drains_pages() {
        let provider = Arc::new(MockProvider::with_standard_types().with_roster_page_size(2));
        let resolver = resolver(provider.clone()).await;

        let added = resolver.sync_roster().await;

        assert_eq!(added, provider.roster_len());
        assert_eq!(provider.list_calls(), provider.roster_len().div_ceil(2));
        assert_eq!(resolver.cached(6).unwrap().name, "charizard");
    }

    #[tokio::test]
    async fn test_sync_roster_skips_when_cached() {
        let provider = Arc::new(MockProvider::with_standard_types());
        let resolver = resolver(provider.clone()).await;

        resolver.sync_roster().await;
        let calls = provider.list_calls();
        assert_eq!(resolver.sync_roster().await, 0);
        assert_eq!(provider.list_calls(), calls);
    }

    #[tokio::test]
    async fn test_resolve_fetches_once() {
        let provider = Arc::new(MockProvider::with_standard_types());
        let resolver = resolver(provider.clone()).await;
        resolver.sync_roster().await;

        let first = resolver.resolve(6).await.unwrap();
        let second = resolver.resolve(6).await.unwrap();

        assert_eq!(first.types(), second.types());
        assert_eq!(
            first.types().unwrap(),
            &["fire".to_string(), "flying".to_string()]
        );
        assert_eq!(provider.detail_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let provider = Arc::new(MockProvider::with_standard_types().with_latency());
        let resolver = resolver(provider.clone()).await;
        resolver.sync_roster().await;

        let (a, b) = tokio::join!(resolver.resolve(94), resolver.resolve(94));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(provider.detail_calls(), 1);
        assert_eq!(resolver.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stale_waiter_keeps_newer_fetch() {
        let provider = Arc::new(MockProvider::with_standard_types().with_detail_gate());
        let resolver = resolver(provider.clone()).await;
        resolver.sync_roster().await;
        provider.fail_details(true);

        // a and b share the first fetch, which fails.
        let a = resolver.resolve(25);
        let b = resolver.resolve(25);
        pin_mut!(a, b);
        assert!(poll!(a.as_mut()).is_pending());
        assert!(poll!(b.as_mut()).is_pending());
        assert_eq!(provider.detail_calls(), 1);

        provider.release_details(1);
        assert!(matches!(poll!(a.as_mut()), Poll::Ready(Err(_))));
        assert_eq!(resolver.in_flight(), 0);

        // c starts a second fetch before b has seen the first one fail.
        provider.fail_details(false);
        let c = resolver.resolve(25);
        pin_mut!(c);
        assert!(poll!(c.as_mut()).is_pending());
        assert_eq!(provider.detail_calls(), 2);

        assert!(matches!(poll!(b.as_mut()), Poll::Ready(Err(_))));
        assert_eq!(resolver.in_flight(), 1);

        // d joins the second fetch instead of starting a third.
        let d = resolver.resolve(25);
        pin_mut!(d);
        assert!(poll!(d.as_mut()).is_pending());
        assert_eq!(provider.detail_calls(), 2);

        provider.release_details(1);
        let c = c.await.unwrap();
        let d = d.await.unwrap();
        assert_eq!(c.types(), Some(&["electric".to_string()][..]));
        assert_eq!(c, d);
        assert_eq!(resolver.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let provider = Arc::new(MockProvider::with_standard_types());
        let resolver = resolver(provider.clone()).await;

        let err = resolver.resolve(9999).await.unwrap_err();
        assert_eq!(err, LookupError::UnknownEntity(9999));
        assert_eq!(provider.detail_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_types_unset() {
        let provider = Arc::new(MockProvider::with_standard_types());
        let resolver = resolver(provider.clone()).await;
        resolver.sync_roster().await;

        provider.fail_details(true);
        let err = resolver.resolve(25).await.unwrap_err();
        assert!(matches!(err, LookupError::ProviderUnavailable(_)));
        assert!(!resolver.cached(25).unwrap().has_types());

        provider.fail_details(false);
        assert!(resolver.resolve(25).await.unwrap().has_types());
        assert_eq!(provider.detail_calls(), 2);
    }
}
