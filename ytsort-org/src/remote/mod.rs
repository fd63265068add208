//! Remote collection access
//!
//! The organizer only talks to the hosting service through the two traits
//! defined here. [`youtube::YouTubeClient`] implements both against the
//! YouTube Data API; [`memory::MemoryRemote`] keeps everything in process.

pub mod details;
pub mod memory;
pub mod youtube;

use crate::models::{CollectionEntry, EntryId, Item, ItemId};
use async_trait::async_trait;
use thiserror::Error;

pub use details::{fetch_details, DetailFetchPlan};
pub use memory::MemoryRemote;
pub use youtube::YouTubeClient;

/// Remote service errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit or quota exceeded")]
    RateLimited,

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Positional access to remote collections
#[async_trait]
pub trait CollectionAccessor: Send + Sync {
    /// Every entry of a collection, in position order, across all pages
    async fn list(&self, collection_id: &str) -> Result<Vec<CollectionEntry>, RemoteError>;

    /// Human-readable collection name
    async fn title(&self, collection_id: &str) -> Result<String, RemoteError>;

    /// Insert `item_id` at `position`, shifting later entries; returns the new entry id
    async fn insert(
        &self,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError>;

    /// Move an existing entry to `position`
    async fn update_position(
        &self,
        entry_id: &str,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError>;

    /// Remove an entry
    async fn delete(&self, entry_id: &str) -> Result<(), RemoteError>;
}

/// Batched item metadata lookups
#[async_trait]
pub trait ItemDetails: Send + Sync {
    /// Largest id batch a single call accepts
    fn max_batch(&self) -> usize {
        50
    }

    /// Details for `item_ids`; ids the remote no longer knows are omitted
    async fn fetch_items(&self, item_ids: &[ItemId]) -> Result<Vec<Item>, RemoteError>;
}
