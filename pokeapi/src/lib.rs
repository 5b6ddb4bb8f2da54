//! Minimal PokeAPI client.
//!
//! This crate provides a focused, read-only client for the three PokeAPI
//! resources the type tracker needs:
//! - Paginated creature listings (`/pokemon/?limit=N`, followed via `next`)
//! - Creature details (only the type slots are decoded)
//! - Type damage relations (`/type/{id}/`)

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://pokeapi.co/api/v2";
const DEFAULT_PAGE_SIZE: usize = 200;

/// Errors that can occur when using the PokeAPI client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// PokeAPI client.
#[derive(Debug, Clone)]
pub struct PokeApi {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
    timeout: Option<Duration>,
}

impl Default for PokeApi {
    fn default() -> Self {
        Self::new(API_BASE)
    }
}

impl PokeApi {
    /// Create a client against the given API base, e.g. `https://pokeapi.co/api/v2`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: None,
        }
    }

    /// Set the number of creatures requested per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Bound every request by a timeout. Requests never time out unless this is set.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The API base this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the first listing page.
    pub fn first_page_url(&self) -> String {
        format!("{}/pokemon/?limit={}", self.base_url, self.page_size)
    }

    /// URL of a type resource.
    pub fn type_url(&self, type_id: u32) -> String {
        format!("{}/type/{type_id}/", self.base_url)
    }

    /// Fetch one listing page.
    ///
    /// `None` requests the first page; otherwise `cursor` is the absolute
    /// `next` URL returned by the previous page.
    pub async fn pokemon_page(&self, cursor: Option<&str>) -> Result<PokemonPage, Error> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self.first_page_url(),
        };
        self.get_json(&url).await
    }

    /// Fetch a creature's detail resource by its absolute URL.
    pub async fn pokemon(&self, url: &str) -> Result<Pokemon, Error> {
        self.get_json(url).await
    }

    /// Fetch the damage relations of a type.
    pub async fn type_relations(&self, type_id: u32) -> Result<TypeRelations, Error> {
        self.get_json(&self.type_url(type_id)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        if url.is_empty() {
            return Err(Error::Config("empty request URL".to_string()));
        }

        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))
    }
}

fn api_error(status: StatusCode, body: String) -> Error {
    Error::Api {
        status: status.as_u16(),
        message: body.chars().take(200).collect(),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A named link to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// One page of the creature listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonPage {
    #[serde(default)]
    pub count: Option<u32>,
    pub next: Option<String>,
    pub results: Vec<NamedResource>,
}

/// The subset of a creature's detail resource this client decodes.
#[derive(Debug, Clone, Deserialize)]
pub struct Pokemon {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    pub types: Vec<PokemonTypeSlot>,
}

impl Pokemon {
    /// Type names in slot order.
    pub fn type_names(&self) -> Vec<String> {
        let mut slots: Vec<&PokemonTypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|s| s.slot);
        slots.into_iter().map(|s| s.kind.name.clone()).collect()
    }
}

/// One type slot of a creature.
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonTypeSlot {
    #[serde(default)]
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

/// A type resource with its damage relations.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeRelations {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    pub damage_relations: DamageRelations,
}

/// Damage relations of a type, both defending (`*_from`) and attacking (`*_to`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DamageRelations {
    #[serde(default)]
    pub double_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub double_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_to: Vec<NamedResource>,
}

/// Names of the resources in a relation list, in API order.
pub fn names(resources: &[NamedResource]) -> Vec<String> {
    resources.iter().map(|r| r.name.clone()).collect()
}
