//! The data provider seam.
//!
//! Everything the tracker learns about creatures and types comes through
//! [`DataProvider`]. [`pokeapi::PokeApi`] is the production implementation;
//! [`crate::testing::MockProvider`] is the scripted one.

use crate::cache::CompatibilityRow;
use async_trait::async_trait;
use thiserror::Error;

/// A provider request failed (network, HTTP status or decoding).
///
/// Cloneable so one in-flight result can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<pokeapi::Error> for ProviderError {
    fn from(err: pokeapi::Error) -> Self {
        ProviderError::Unavailable(err.to_string())
    }
}

/// One creature in a roster page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySummary {
    pub name: String,
    pub detail_url: String,
}

/// A page of the creature roster.
#[derive(Debug, Clone, Default)]
pub struct EntityPage {
    pub results: Vec<EntitySummary>,
    pub next_cursor: Option<String>,
}

/// The parts of a creature's detail the tracker uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDetail {
    /// Type names in slot order.
    pub types: Vec<String>,
}

/// A type's name and defending relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRelations {
    pub name: String,
    pub row: CompatibilityRow,
}

/// Read-only source of creature and type data.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch a roster page. `None` is the first page.
    async fn fetch_entity_list(&self, cursor: Option<&str>) -> Result<EntityPage, ProviderError>;

    /// Fetch a creature's detail by the URL listed in its roster entry.
    async fn fetch_entity_detail(&self, url: &str) -> Result<EntityDetail, ProviderError>;

    /// Fetch the relations of the type with numeric id `category_id`.
    async fn fetch_category_relations(
        &self,
        category_id: u32,
    ) -> Result<CategoryRelations, ProviderError>;
}

#[async_trait]
impl DataProvider for pokeapi::PokeApi {
    async fn fetch_entity_list(&self, cursor: Option<&str>) -> Result<EntityPage, ProviderError> {
        let page = self.pokemon_page(cursor).await?;
        Ok(EntityPage {
            results: page
                .results
                .into_iter()
                .map(|r| EntitySummary {
                    name: r.name,
                    detail_url: r.url,
                })
                .collect(),
            next_cursor: page.next,
        })
    }

    async fn fetch_entity_detail(&self, url: &str) -> Result<EntityDetail, ProviderError> {
        let pokemon = self.pokemon(url).await?;
        Ok(EntityDetail {
            types: pokemon.type_names(),
        })
    }

    async fn fetch_category_relations(
        &self,
        category_id: u32,
    ) -> Result<CategoryRelations, ProviderError> {
        let data = self.type_relations(category_id).await?;
        let relations = &data.damage_relations;
        Ok(CategoryRelations {
            row: CompatibilityRow {
                double_from: pokeapi::names(&relations.double_damage_from),
                zero_from: pokeapi::names(&relations.no_damage_from),
                half_from: pokeapi::names(&relations.half_damage_from),
            },
            name: data.name,
        })
    }
}
