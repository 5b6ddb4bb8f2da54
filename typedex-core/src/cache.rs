//! Two-namespace lookup cache with write-through persistence.
//!
//! The creature namespace maps identifiers to [`EntityRecord`]s; the relation
//! namespace maps type keys (numeric id and name) to [`CompatibilityRow`]s.
//! Entries are never invalidated or evicted, so a cache hit never re-fetches.

use crate::persist::{encode_document, load_document, Storage, ENTITY_KEY, RELATIONS_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// Creature identifier as assigned by the data provider.
pub type EntityId = u32;

/// A creature seen in the roster, with its types once they are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    types: Option<Vec<String>>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            types: None,
        }
    }

    /// Builder form of [`EntityRecord::assign_types`].
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.assign_types(types);
        self
    }

    /// The creature's types in slot order, if fetched.
    pub fn types(&self) -> Option<&[String]> {
        self.types.as_deref()
    }

    pub fn has_types(&self) -> bool {
        self.types.is_some()
    }

    /// Set the types. Only the first assignment takes effect; returns whether it did.
    pub fn assign_types(&mut self, types: Vec<String>) -> bool {
        if self.types.is_some() {
            return false;
        }
        self.types = Some(types);
        true
    }
}

/// The defending relations of one type: which attacking types hit it for
/// double, zero and half damage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRow {
    #[serde(rename = "double_damage_from", default)]
    pub double_from: Vec<String>,
    #[serde(rename = "no_damage_from", default)]
    pub zero_from: Vec<String>,
    #[serde(rename = "half_damage_from", default)]
    pub half_from: Vec<String>,
}

/// The two cache namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Entities,
    Relations,
}

impl Namespace {
    /// Durable storage key of this namespace.
    pub fn storage_key(self) -> &'static str {
        match self {
            Namespace::Entities => ENTITY_KEY,
            Namespace::Relations => RELATIONS_KEY,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entities: BTreeMap<EntityId, EntityRecord>,
    relations: BTreeMap<String, CompatibilityRow>,
}

/// Process-wide cache, loaded once and written through on every mutation.
///
/// Mutations update memory first; the namespace document is encoded under
/// the state lock and written after it is released. Writes of one namespace
/// are serialized so the last write always carries the newest snapshot.
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    state: Mutex<CacheState>,
    entity_writes: AsyncMutex<()>,
    relation_writes: AsyncMutex<()>,
}

impl CacheStore {
    /// Load both namespaces from `storage`.
    ///
    /// A namespace that cannot be read or decoded starts empty.
    pub async fn load(storage: Arc<dyn Storage>) -> Self {
        let entities = load_namespace(storage.as_ref(), Namespace::Entities).await;
        let relations = load_namespace(storage.as_ref(), Namespace::Relations).await;

        info!(
            entities = entities.len(),
            relations = relations.len(),
            "loaded lookup cache"
        );

        Self {
            storage,
            state: Mutex::new(CacheState {
                entities,
                relations,
            }),
            entity_writes: AsyncMutex::new(()),
            relation_writes: AsyncMutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Creature namespace
    // =========================================================================

    pub fn entity(&self, id: EntityId) -> Option<EntityRecord> {
        self.lock().entities.get(&id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn put_entity(&self, id: EntityId, record: EntityRecord) {
        self.put_entities([(id, record)]).await;
    }

    /// Insert a batch of records as a single mutation.
    pub async fn put_entities(&self, records: impl IntoIterator<Item = (EntityId, EntityRecord)>) {
        self.lock().entities.extend(records);
        self.persist(Namespace::Entities).await;
    }

    /// Record the types of a cached creature.
    ///
    /// Returns the record as stored afterwards, or `None` if the creature is not
    /// cached. Types already present are kept; the new ones are ignored.
    pub async fn assign_types(&self, id: EntityId, types: Vec<String>) -> Option<EntityRecord> {
        let (record, changed) = {
            let mut state = self.lock();
            let record = state.entities.get_mut(&id)?;
            let changed = record.assign_types(types);
            (record.clone(), changed)
        };
        if changed {
            debug!(id, name = %record.name, "stored creature types");
            self.persist(Namespace::Entities).await;
        }
        Some(record)
    }

    /// Snapshot of the whole creature namespace.
    pub fn entities(&self) -> BTreeMap<EntityId, EntityRecord> {
        self.lock().entities.clone()
    }

    pub fn entity_count(&self) -> usize {
        self.lock().entities.len()
    }

    // =========================================================================
    // Relation namespace
    // =========================================================================

    pub fn relation(&self, key: &str) -> Option<CompatibilityRow> {
        self.lock().relations.get(key).cloned()
    }

    pub fn has_relation(&self, key: &str) -> bool {
        self.lock().relations.contains_key(key)
    }

    /// Store one row under every key in `keys` as a single mutation.
    pub async fn put_relation<K: AsRef<str>>(&self, keys: &[K], row: CompatibilityRow) {
        {
            let mut state = self.lock();
            for key in keys {
                state
                    .relations
                    .insert(key.as_ref().to_string(), row.clone());
            }
        }
        self.persist(Namespace::Relations).await;
    }

    /// Snapshot of the whole relation namespace.
    pub fn relations(&self) -> BTreeMap<String, CompatibilityRow> {
        self.lock().relations.clone()
    }

    async fn persist(&self, namespace: Namespace) {
        let _writer = match namespace {
            Namespace::Entities => self.entity_writes.lock().await,
            Namespace::Relations => self.relation_writes.lock().await,
        };

        let snapshot = {
            let state = self.lock();
            match namespace {
                Namespace::Entities => encode_document(&state.entities),
                Namespace::Relations => encode_document(&state.relations),
            }
        };

        let result = match snapshot {
            Ok(content) => self.storage.write(namespace.storage_key(), &content).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(key = namespace.storage_key(), error = %e, "failed to persist cache namespace");
        }
    }
}

async fn load_namespace<K, V>(storage: &dyn Storage, namespace: Namespace) -> BTreeMap<K, V>
where
    K: Ord + serde::de::DeserializeOwned,
    V: serde::de::DeserializeOwned,
{
    match load_document(storage, namespace.storage_key()).await {
        Ok(Some(map)) => map,
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            warn!(key = namespace.storage_key(), error = %e, "discarding unreadable cache namespace");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStorage;
    use crate::testing::FailingStorage;

    fn fire_row() -> CompatibilityRow {
        CompatibilityRow {
            double_from: vec!["water".into(), "ground".into(), "rock".into()],
            zero_from: vec![],
            half_from: vec!["fire".into(), "grass".into()],
        }
    }

    #[test]
    fn test_types_assigned_once() {
        let mut record = EntityRecord::new("charmander", "https://pokeapi.co/api/v2/pokemon/4/");
        assert!(!record.has_types());

        assert!(record.assign_types(vec!["fire".into()]));
        assert!(!record.assign_types(vec!["water".into()]));
        assert_eq!(record.types(), Some(&["fire".to_string()][..]));
    }

    #[tokio::test]
    async fn test_put_entity_writes_through() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = CacheStore::load(storage.clone()).await;

        cache.put_entity(25, EntityRecord::new("pikachu", "u")).await;

        let raw = storage.read(ENTITY_KEY).await.unwrap().expect("namespace written");
        assert!(raw.contains("pikachu"));
        assert!(storage.read(RELATIONS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reload_is_verbatim() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let cache = CacheStore::load(storage.clone()).await;
            cache.put_entity(4, EntityRecord::new("charmander", "u4").with_types(vec!["fire".into()])).await;
            cache.put_entity(1, EntityRecord::new("bulbasaur", "u1")).await;
            cache.put_relation(&["10", "fire"], fire_row()).await;
        }

        let reloaded = CacheStore::load(storage).await;
        assert_eq!(reloaded.entity_count(), 2);
        assert_eq!(
            reloaded.entity(4).unwrap().types(),
            Some(&["fire".to_string()][..])
        );
        assert!(!reloaded.entity(1).unwrap().has_types());
        assert_eq!(reloaded.relation("10"), Some(fire_row()));
        assert_eq!(reloaded.relation("fire"), Some(fire_row()));
    }

    #[tokio::test]
    async fn test_assign_types_on_cache() {
        let cache = CacheStore::load(Arc::new(MemoryStorage::new())).await;
        cache.put_entity(6, EntityRecord::new("charizard", "u6")).await;

        let stored = cache
            .assign_types(6, vec!["fire".into(), "flying".into()])
            .await
            .unwrap();
        assert_eq!(stored.types().unwrap().len(), 2);

        let again = cache.assign_types(6, vec!["water".into()]).await.unwrap();
        assert_eq!(again.types().unwrap()[0], "fire");

        assert!(cache.assign_types(999, vec![]).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_namespace_starts_empty() {
        let storage = MemoryStorage::new()
            .with_document(ENTITY_KEY, "not json")
            .with_document(RELATIONS_KEY, r#"{"fire": {"double_damage_from": ["water"]}}"#);
        let cache = CacheStore::load(Arc::new(storage)).await;

        assert_eq!(cache.entity_count(), 0);
        let row = cache.relation("fire").unwrap();
        assert_eq!(row.double_from, vec!["water"]);
        assert!(row.half_from.is_empty());
    }

    #[tokio::test]
    async fn test_missing_relation_is_absent() {
        let cache = CacheStore::load(Arc::new(MemoryStorage::new())).await;
        assert!(cache.relation("fire").is_none());
        assert!(!cache.has_relation("fire"));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_authoritative() {
        let storage = Arc::new(FailingStorage::new());
        let cache = CacheStore::load(storage.clone()).await;

        cache.put_entity(6, EntityRecord::new("charizard", "u6")).await;
        cache
            .put_entities([(4, EntityRecord::new("charmander", "u4"))])
            .await;
        let stored = cache
            .assign_types(6, vec!["fire".into(), "flying".into()])
            .await
            .expect("creature stays cached");
        cache.put_relation(&["10", "fire"], fire_row()).await;

        assert_eq!(cache.entity_count(), 2);
        assert_eq!(stored.types().unwrap().len(), 2);
        assert_eq!(cache.entity(6).unwrap().types(), stored.types());
        assert_eq!(cache.relation("10"), Some(fire_row()));
        assert_eq!(cache.relation("fire"), Some(fire_row()));
        assert_eq!(storage.write_attempts(), 4);
    }
}
