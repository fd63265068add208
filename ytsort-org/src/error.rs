//! Error types for ytsort-org

use crate::remote::RemoteError;
use thiserror::Error;

/// Organizer error type
#[derive(Debug, Error)]
pub enum Error {
    /// Listing or describing a source collection failed; the pass aborts
    #[error("Failed to fetch collection {collection_id}: {source}")]
    SourceFetch {
        collection_id: String,
        #[source]
        source: RemoteError,
    },

    /// A remote insert, reposition or delete failed mid-sequence
    #[error("Remote {operation} failed for item {item_id}: {source}")]
    RemoteMutation {
        operation: &'static str,
        item_id: String,
        #[source]
        source: RemoteError,
    },

    /// Any other remote failure (item detail lookups)
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Category not present in the ranks file
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Ranks file or settings unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// ytsort-common error
    #[error("Common error: {0}")]
    Common(#[from] ytsort_common::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON (de)serialization of persisted state
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for organizer operations
pub type Result<T> = std::result::Result<T, Error>;
