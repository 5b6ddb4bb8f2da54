//! Type effectiveness tracking for observed creatures.
//!
//! This crate provides:
//! - A two-namespace lookup cache (creatures, type relations) persisted as JSON
//! - Lazy, de-duplicated fetching through a [`DataProvider`]
//! - Exact aggregation of a creature's types into grouped damage multipliers
//! - Suppression of creatures shown moments ago
//!
//! # Quick Start
//!
//! ```ignore
//! use typedex_core::{Tracker, TrackerConfig, render_panel};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let tracker = Tracker::connect(TrackerConfig::new().with_cache_dir(".typedex")).await;
//!     tracker.warm_up().await;
//!
//!     if let Ok(Some(panel)) = tracker.lookup(6).await {
//!         for line in render_panel(&panel) {
//!             println!("{line}");
//!         }
//!     }
//! }
//! ```

pub mod cache;
pub mod effectiveness;
pub mod entities;
pub mod error;
pub mod persist;
pub mod provider;
pub mod recent;
pub mod relations;
pub mod render;
pub mod testing;
pub mod tracker;

// Primary public API
pub use cache::{CacheStore, CompatibilityRow, EntityId, EntityRecord};
pub use effectiveness::{aggregate, EffectGroup, Effectiveness, GroupedResult, Multiplier};
pub use error::{LookupError, LookupResult};
pub use persist::{FileStorage, MemoryStorage, Storage};
pub use provider::{DataProvider, ProviderError};
pub use render::render_panel;
pub use testing::{FailingStorage, MockProvider};
pub use tracker::{observed_entity_id, Panel, Presenter, Tracker, TrackerConfig, WarmUp};
