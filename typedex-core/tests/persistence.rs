//! Cross-session persistence of the lookup caches.
//!
//! Run with: `cargo test -p typedex-core --test persistence`

use std::sync::Arc;
use tempfile::TempDir;
use typedex_core::persist::{ENTITY_KEY, RELATIONS_KEY};
use typedex_core::{FileStorage, MockProvider, Storage, Tracker, TrackerConfig};

async fn session(dir: &TempDir, provider: Arc<MockProvider>) -> Tracker {
    let config = TrackerConfig::new()
        .with_category_ids(1..=18)
        .with_cache_dir(dir.path());
    let storage = config.storage();
    Tracker::new(config, provider, storage).await
}

#[tokio::test]
async fn test_second_session_uses_cache() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let first = Arc::new(MockProvider::with_standard_types());
    {
        let tracker = session(&temp_dir, first.clone()).await;
        tracker.warm_up().await;
        tracker.lookup(6).await.unwrap().expect("first show");
    }
    assert_eq!(first.detail_calls(), 1);

    let second = Arc::new(MockProvider::with_standard_types());
    let tracker = session(&temp_dir, second.clone()).await;
    let warm = tracker.warm_up().await;

    assert_eq!(warm.roster_added, 0);
    assert_eq!(warm.relations_fetched, 0);

    let panel = tracker.lookup(6).await.unwrap().expect("new session, empty window");
    assert_eq!(panel.name, "charizard");
    assert!(panel.is_complete());

    assert_eq!(second.list_calls(), 0);
    assert_eq!(second.relation_calls(), 0);
    assert_eq!(second.detail_calls(), 0);
}

#[tokio::test]
async fn test_namespaces_written_under_fixed_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tracker = session(&temp_dir, Arc::new(MockProvider::with_standard_types())).await;
    tracker.warm_up().await;

    let storage = FileStorage::new(temp_dir.path());
    let entities = storage.read(ENTITY_KEY).await.unwrap().expect("roster written");
    let relations = storage.read(RELATIONS_KEY).await.unwrap().expect("relations written");

    let entities: serde_json::Value = serde_json::from_str(&entities).unwrap();
    assert_eq!(entities["25"]["name"], "pikachu");
    assert!(entities["25"].get("types").is_none());

    let relations: serde_json::Value = serde_json::from_str(&relations).unwrap();
    assert_eq!(relations["10"], relations["fire"]);
    assert_eq!(relations["fire"]["double_damage_from"][0], "water");
}

#[tokio::test]
async fn test_types_persist_after_fetch() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tracker = session(&temp_dir, Arc::new(MockProvider::with_standard_types())).await;
    tracker.warm_up().await;
    tracker.entities().resolve(94).await.unwrap();

    let raw = FileStorage::new(temp_dir.path())
        .read(ENTITY_KEY)
        .await
        .unwrap()
        .unwrap();
    let entities: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(entities["94"]["types"], serde_json::json!(["ghost", "poison"]));
}

#[tokio::test]
async fn test_corrupt_cache_file_is_rebuilt() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    FileStorage::new(temp_dir.path())
        .write(ENTITY_KEY, "{ truncated")
        .await
        .unwrap();

    let provider = Arc::new(MockProvider::with_standard_types());
    let tracker = session(&temp_dir, provider.clone()).await;
    let warm = tracker.warm_up().await;

    assert_eq!(warm.roster_added, provider.roster_len());
    assert!(tracker.lookup(1).await.unwrap().is_some());
}
