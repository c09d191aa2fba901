//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An item, rule, or VIP contact with the given id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        kind: &'static str,
        /// The id that failed to resolve.
        id: String,
    },

    /// Input was rejected before any state change was applied.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external collaborator (message store, summarizer) failed.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

impl Error {
    /// Build a `NotFound` error for the given record kind and id.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
