//! Testing utilities for the tracker.
//!
//! `MockProvider` is a scripted [`DataProvider`] for deterministic tests
//! without network access. It counts every request and can be told to fail
//! any of the three request kinds. `FailingStorage` rejects every write.

use crate::cache::{CompatibilityRow, EntityId};
use crate::entities::entity_id_from_url;
use crate::persist::{PersistError, Storage};
use crate::provider::{
    CategoryRelations, DataProvider, EntityDetail, EntityPage, EntitySummary, ProviderError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

const MOCK_BASE: &str = "mock://pokeapi";

/// A scripted data provider.
#[derive(Debug, Default)]
pub struct MockProvider {
    roster: Vec<(EntityId, String, Vec<String>)>,
    relations: HashMap<u32, CategoryRelations>,
    page_size: usize,
    latency: bool,
    detail_gate: Option<Semaphore>,
    fail_list: AtomicBool,
    fail_details: AtomicBool,
    fail_relations: AtomicBool,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    relation_calls: AtomicUsize,
}

impl MockProvider {
    /// An empty provider: no creatures, no types.
    pub fn new() -> Self {
        Self {
            page_size: 200,
            ..Default::default()
        }
    }

    /// The 18 standard types (ids 1 to 18) and a handful of creatures.
    pub fn with_standard_types() -> Self {
        let mut provider = Self::new();
        for (id, name, double, zero, half) in STANDARD_CHART {
            provider = provider.with_relations(*id, name, double, zero, half);
        }
        for (id, name, types) in STANDARD_ROSTER {
            provider = provider.with_entity(*id, name, types);
        }
        provider
    }

    /// Add a creature to the roster.
    pub fn with_entity(mut self, id: EntityId, name: &str, types: &[&str]) -> Self {
        self.roster.push((
            id,
            name.to_string(),
            types.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    /// Script the relations of a type.
    pub fn with_relations(
        mut self,
        id: u32,
        name: &str,
        double_from: &[&str],
        zero_from: &[&str],
        half_from: &[&str],
    ) -> Self {
        let list = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        self.relations.insert(
            id,
            CategoryRelations {
                name: name.to_string(),
                row: CompatibilityRow {
                    double_from: list(double_from),
                    zero_from: list(zero_from),
                    half_from: list(half_from),
                },
            },
        );
        self
    }

    /// Number of creatures per roster page.
    pub fn with_roster_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Yield to the scheduler once before answering each request.
    pub fn with_latency(mut self) -> Self {
        self.latency = true;
        self
    }

    /// Hold every detail request until [`MockProvider::release_details`]
    /// lets it through.
    pub fn with_detail_gate(mut self) -> Self {
        self.detail_gate = Some(Semaphore::new(0));
        self
    }

    /// Let `count` held detail requests answer, oldest first.
    pub fn release_details(&self, count: usize) {
        if let Some(gate) = &self.detail_gate {
            gate.add_permits(count);
        }
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_details(&self, fail: bool) {
        self.fail_details.store(fail, Ordering::SeqCst);
    }

    pub fn fail_relations(&self, fail: bool) {
        self.fail_relations.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn relation_calls(&self) -> usize {
        self.relation_calls.load(Ordering::SeqCst)
    }

    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// The detail URL the roster lists for a creature.
    pub fn detail_url(id: EntityId) -> String {
        format!("{MOCK_BASE}/pokemon/{id}/")
    }

    async fn respond(&self) {
        if self.latency {
            tokio::task::yield_now().await;
        }
    }
}

fn unavailable(what: impl Into<String>) -> ProviderError {
    ProviderError::Unavailable(what.into())
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn fetch_entity_list(&self, cursor: Option<&str>) -> Result<EntityPage, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable("scripted roster failure"));
        }

        let offset = match cursor {
            None => 0,
            Some(cursor) => cursor
                .rsplit_once("offset=")
                .and_then(|(_, n)| n.parse::<usize>().ok())
                .ok_or_else(|| unavailable(format!("bad cursor {cursor}")))?,
        };

        let end = (offset + self.page_size).min(self.roster.len());
        let results = self.roster[offset.min(end)..end]
            .iter()
            .map(|(id, name, _)| EntitySummary {
                name: name.clone(),
                detail_url: Self::detail_url(*id),
            })
            .collect();
        let next_cursor =
            (end < self.roster.len()).then(|| format!("{MOCK_BASE}/pokemon/?offset={end}"));

        Ok(EntityPage {
            results,
            next_cursor,
        })
    }

    async fn fetch_entity_detail(&self, url: &str) -> Result<EntityDetail, ProviderError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.detail_gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.respond().await;

        if self.fail_details.load(Ordering::SeqCst) {
            return Err(unavailable("scripted detail failure"));
        }

        let id = entity_id_from_url(url).ok_or_else(|| unavailable(format!("bad url {url}")))?;
        self.roster
            .iter()
            .find(|(entry, _, _)| *entry == id)
            .map(|(_, _, types)| EntityDetail {
                types: types.clone(),
            })
            .ok_or_else(|| unavailable(format!("404 for {url}")))
    }

    async fn fetch_category_relations(
        &self,
        category_id: u32,
    ) -> Result<CategoryRelations, ProviderError> {
        self.relation_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;

        if self.fail_relations.load(Ordering::SeqCst) {
            return Err(unavailable("scripted relation failure"));
        }

        self.relations
            .get(&category_id)
            .cloned()
            .ok_or_else(|| unavailable(format!("404 for type {category_id}")))
    }
}

/// Storage whose reads find nothing and whose writes always fail, like a
/// read-only or full disk.
#[derive(Debug, Default)]
pub struct FailingStorage {
    write_attempts: AtomicUsize,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn read(&self, _key: &str) -> Result<Option<String>, PersistError> {
        Ok(None)
    }

    async fn write(&self, key: &str, _value: &str) -> Result<(), PersistError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{key} is read-only"),
        )))
    }
}

type ChartEntry = (
    u32,
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

/// Defending relations: (id, name, double from, no damage from, half from).
const STANDARD_CHART: &[ChartEntry] = &[
    (1, "normal", &["fighting"], &["ghost"], &[]),
    (2, "fighting", &["flying", "psychic", "fairy"], &[], &["rock", "bug", "dark"]),
    (3, "flying", &["rock", "electric", "ice"], &["ground"], &["fighting", "bug", "grass"]),
    (4, "poison", &["ground", "psychic"], &[], &["fighting", "poison", "bug", "grass", "fairy"]),
    (5, "ground", &["water", "grass", "ice"], &["electric"], &["poison", "rock"]),
    (6, "rock", &["fighting", "ground", "steel", "water", "grass"], &[], &["normal", "flying", "poison", "fire"]),
    (7, "bug", &["flying", "rock", "fire"], &[], &["fighting", "ground", "grass"]),
    (8, "ghost", &["ghost", "dark"], &["normal", "fighting"], &["poison", "bug"]),
    (
        9,
        "steel",
        &["fighting", "ground", "fire"],
        &["poison"],
        &["normal", "flying", "rock", "bug", "steel", "grass", "psychic", "ice", "dragon", "fairy"],
    ),
    (10, "fire", &["water", "ground", "rock"], &[], &["fire", "grass", "ice", "bug", "steel", "fairy"]),
    (11, "water", &["grass", "electric"], &[], &["steel", "fire", "water", "ice"]),
    (12, "grass", &["flying", "poison", "bug", "fire", "ice"], &[], &["ground", "water", "grass", "electric"]),
    (13, "electric", &["ground"], &[], &["flying", "steel", "electric"]),
    (14, "psychic", &["bug", "ghost", "dark"], &[], &["fighting", "psychic"]),
    (15, "ice", &["fighting", "rock", "steel", "fire"], &[], &["ice"]),
    (16, "dragon", &["ice", "dragon", "fairy"], &[], &["fire", "water", "grass", "electric"]),
    (17, "dark", &["fighting", "bug", "fairy"], &["psychic"], &["ghost", "dark"]),
    (18, "fairy", &["poison", "steel"], &["dragon"], &["fighting", "bug", "dark"]),
];

const STANDARD_ROSTER: &[(EntityId, &str, &[&str])] = &[
    (1, "bulbasaur", &["grass", "poison"]),
    (4, "charmander", &["fire"]),
    (6, "charizard", &["fire", "flying"]),
    (25, "pikachu", &["electric"]),
    (94, "gengar", &["ghost", "poison"]),
    (197, "umbreon", &["dark"]),
    (302, "sableye", &["dark", "ghost"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_pagination() {
        let provider = MockProvider::with_standard_types().with_roster_page_size(3);

        let first = provider.fetch_entity_list(None).await.unwrap();
        assert_eq!(first.results.len(), 3);
        let cursor = first.next_cursor.expect("more pages");

        let second = provider.fetch_entity_list(Some(&cursor)).await.unwrap();
        assert_eq!(second.results[0].name, "pikachu");
    }

    #[tokio::test]
    async fn test_mock_failures_are_counted() {
        let provider = MockProvider::with_standard_types();
        provider.fail_relations(true);

        assert!(provider.fetch_category_relations(10).await.is_err());
        assert_eq!(provider.relation_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_detail() {
        let provider = MockProvider::with_standard_types();
        let detail = provider
            .fetch_entity_detail(&MockProvider::detail_url(302))
            .await
            .unwrap();
        assert_eq!(detail.types, vec!["dark", "ghost"]);
    }
}
