//! Record cache: item metadata and collection membership
//!
//! Metadata is read-through (fetched from the remote on a miss when the
//! caller allows it) and cached indefinitely. Unavailable placeholders are
//! refetched by any lookup that allows it. Membership is write-through:
//! every successful remote mutation updates it immediately.

pub mod sqlite;

use crate::error::Result;
use crate::models::{Item, ItemId, Membership, MembershipRecord};
use async_trait::async_trait;
use std::collections::HashMap;

pub use sqlite::SqliteRecordCache;

#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Cached metadata; on a miss or a cached unavailable item, fetch from
    /// the remote if allowed
    async fn lookup(&self, item_id: &str, allow_remote_fetch: bool) -> Result<Option<Item>>;

    /// Batch form of [`RecordCache::lookup`]; misses are fetched together
    async fn lookup_many(
        &self,
        item_ids: &[ItemId],
        allow_remote_fetch: bool,
    ) -> Result<HashMap<ItemId, Item>>;

    /// Record that `item_id` sits in `collection_id`, replacing any earlier fact
    async fn set_membership(
        &self,
        item_id: &str,
        collection_id: &str,
        membership: Membership,
    ) -> Result<()>;

    /// Forget the (item, collection) pair
    async fn clear_membership(&self, item_id: &str, collection_id: &str) -> Result<()>;

    async fn has_membership(&self, item_id: &str, collection_id: &str) -> Result<bool>;

    async fn membership_record(&self, item_id: &str) -> Result<Option<MembershipRecord>>;

    /// Item ids the cache believes are members of `collection_id`
    async fn collection_members(&self, collection_id: &str) -> Result<Vec<ItemId>>;
}
