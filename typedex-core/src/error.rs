//! Error types for lookups.
//!
//! None of these are fatal: callers report them and carry on.

use crate::cache::EntityId;
use crate::provider::ProviderError;

/// Why a lookup produced no panel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The provider could not be reached or returned something unreadable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A type's relations are pending or failed to load
    #[error("Unresolved type: {0}")]
    UnresolvedAttribute(String),

    /// The identifier is not in the roster
    #[error("Pokemon data not found for ID: {0}")]
    UnknownEntity(EntityId),
}

impl From<ProviderError> for LookupError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(reason) => LookupError::ProviderUnavailable(reason),
        }
    }
}

/// Result type for lookups.
pub type LookupResult<T> = std::result::Result<T, LookupError>;
