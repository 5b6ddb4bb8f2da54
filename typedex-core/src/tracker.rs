//! Tracker - the primary public API.
//!
//! Wires the cache, the type relation resolver, the creature resolver and the
//! recent-lookup filter into the lookup flow: an observed creature id becomes
//! a [`Panel`] of grouped multipliers, or nothing if it was shown moments ago.

use crate::cache::{CacheStore, EntityId, EntityRecord};
use crate::effectiveness::{aggregate, Effectiveness, GroupedResult};
use crate::entities::EntityResolver;
use crate::error::{LookupError, LookupResult};
use crate::persist::{FileStorage, MemoryStorage, Storage};
use crate::provider::DataProvider;
use crate::recent::{RecentLookups, DEFAULT_CAPACITY};
use crate::relations::{CompatibilityResolver, CATEGORY_IDS};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

static RESOURCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)\.json").expect("static regex is valid"));

/// The creature id in an observed resource URL, e.g.
/// `https://pokerogue.net/battle-anims/…/25.json` yields 25.
///
/// Only the URL path is inspected. Anything else yields `None`.
pub fn observed_entity_id(resource: &str) -> Option<EntityId> {
    let url = url::Url::parse(resource).ok()?;
    RESOURCE_ID
        .captures(url.path())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Configuration for a tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL of the REST API.
    pub api_base: String,

    /// Creatures requested per roster page.
    pub page_size: usize,

    /// Type ids prefetched at warm-up.
    pub category_ids: RangeInclusive<u32>,

    /// Number of recently shown names that suppress a repeat.
    pub recent_capacity: usize,

    /// Directory for the persisted caches. `None` keeps them in memory.
    pub cache_dir: Option<PathBuf>,

    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://pokeapi.co/api/v2".to_string(),
            page_size: 200,
            category_ids: CATEGORY_IDS,
            recent_capacity: DEFAULT_CAPACITY,
            cache_dir: None,
            request_timeout: None,
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the roster page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the type ids prefetched at warm-up.
    pub fn with_category_ids(mut self, ids: RangeInclusive<u32>) -> Self {
        self.category_ids = ids;
        self
    }

    /// Set the recent-lookup window size.
    pub fn with_recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = capacity;
        self
    }

    /// Persist caches under `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Bound every provider request by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// The PokeAPI client described by this config.
    pub fn client(&self) -> pokeapi::PokeApi {
        let client = pokeapi::PokeApi::new(&self.api_base).with_page_size(self.page_size);
        match self.request_timeout {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        }
    }

    /// The durable storage described by this config.
    pub fn storage(&self) -> Arc<dyn Storage> {
        match &self.cache_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        }
    }
}

/// What to display for one creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    /// Creature name as listed in the roster.
    pub name: String,

    /// Non-neutral multipliers, ascending.
    pub groups: GroupedResult,

    /// Types skipped because their relations were not loaded.
    pub unresolved: Vec<String>,
}

impl Panel {
    /// Whether every type contributed to the groups.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Receives lookup results for display.
pub trait Presenter {
    /// Display a creature's panel.
    fn show(&mut self, panel: &Panel);

    /// Report an id that is not in the roster.
    fn not_found(&mut self, id: EntityId);
}

/// Outcome of [`Tracker::warm_up`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmUp {
    pub roster_added: usize,
    pub relations_fetched: usize,
}

/// A type effectiveness tracker.
///
/// This is the main entry point. It manages:
/// - The persisted creature and type caches
/// - Fetching through the data provider
/// - Suppressing repeats of recently shown creatures
pub struct Tracker {
    config: TrackerConfig,
    cache: Arc<CacheStore>,
    relations: CompatibilityResolver,
    entities: EntityResolver,
    recent: Mutex<RecentLookups>,
}

impl Tracker {
    /// Create a tracker over an explicit provider and storage, loading the
    /// persisted caches.
    pub async fn new(
        config: TrackerConfig,
        provider: Arc<dyn DataProvider>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let cache = Arc::new(CacheStore::load(storage).await);
        let relations = CompatibilityResolver::new(Arc::clone(&cache), Arc::clone(&provider));
        let entities = EntityResolver::new(Arc::clone(&cache), provider);
        let recent = Mutex::new(RecentLookups::new(config.recent_capacity));

        Self {
            config,
            cache,
            relations,
            entities,
            recent,
        }
    }

    /// Create a tracker talking to the configured API with the configured storage.
    pub async fn connect(config: TrackerConfig) -> Self {
        let provider: Arc<dyn DataProvider> = Arc::new(config.client());
        let storage = config.storage();
        Self::new(config, provider, storage).await
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn relations(&self) -> &CompatibilityResolver {
        &self.relations
    }

    pub fn entities(&self) -> &EntityResolver {
        &self.entities
    }

    /// Fill whatever the caches are missing: the roster if empty, and every
    /// configured type not yet known. Both run concurrently.
    pub async fn warm_up(&self) -> WarmUp {
        let (roster_added, relations_fetched) = futures::join!(
            self.entities.sync_roster(),
            self.relations.prefetch(self.config.category_ids.clone()),
        );

        info!(roster_added, relations_fetched, "tracker warmed up");
        WarmUp {
            roster_added,
            relations_fetched,
        }
    }

    /// Multipliers against a creature with known types.
    ///
    /// Types whose relations are not cached are skipped.
    pub fn effectiveness(&self, record: &EntityRecord) -> Effectiveness {
        let types = record.types().unwrap_or_default();
        aggregate(types, |category| match self.relations.require(category) {
            Ok(row) => Some(row),
            Err(e) => {
                debug!(creature = %record.name, error = %e, "skipping type");
                None
            }
        })
    }

    /// Look up an observed creature.
    ///
    /// Returns `Ok(None)` when the creature's name was shown recently. The
    /// name is recorded before its types are fetched, so a failed fetch still
    /// suppresses immediate repeats.
    pub async fn lookup(&self, id: EntityId) -> LookupResult<Option<Panel>> {
        let record = self
            .entities
            .cached(id)
            .ok_or(LookupError::UnknownEntity(id))?;

        let show = self
            .recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_show(&record.name);
        if !show {
            debug!(id, name = %record.name, "recently shown");
            return Ok(None);
        }

        let record = self.entities.resolve(id).await?;
        let effectiveness = self.effectiveness(&record);

        Ok(Some(Panel {
            name: record.name,
            groups: effectiveness.grouped(),
            unresolved: effectiveness.unresolved().to_vec(),
        }))
    }

    /// Look up `id` and hand the outcome to `presenter`.
    ///
    /// Provider failures are logged, never surfaced.
    pub async fn handle<P>(&self, id: EntityId, presenter: &mut P)
    where
        P: Presenter + ?Sized,
    {
        match self.lookup(id).await {
            Ok(Some(panel)) => presenter.show(&panel),
            Ok(None) => {}
            Err(LookupError::UnknownEntity(id)) => presenter.not_found(id),
            Err(e) => warn!(id, error = %e, "lookup failed"),
        }
    }

    /// Handle an observed resource URL. Returns whether it named a creature.
    pub async fn observe<P>(&self, resource: &str, presenter: &mut P) -> bool
    where
        P: Presenter + ?Sized,
    {
        match observed_entity_id(resource) {
            Some(id) => {
                self.handle(id, presenter).await;
                true
            }
            None => false,
        }
    }
}
