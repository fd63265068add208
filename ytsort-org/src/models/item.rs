//! Item metadata and cached membership facts

use super::{CollectionId, EntryId, ItemId, SourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ytsort_common::config::OrganizerConfig;

/// An externally hosted media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub source_id: SourceId,
    pub source_title: String,
    pub duration_secs: u64,
    pub published_at: DateTime<Utc>,
    /// Private, deleted, or otherwise not returned by the detail endpoint
    pub private: bool,
}

impl Item {
    /// Placeholder recorded when the remote no longer returns details for an id
    pub fn unavailable(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            title: "Unavailable item".to_string(),
            source_id: String::new(),
            source_title: String::new(),
            duration_secs: 0,
            published_at: DateTime::<Utc>::UNIX_EPOCH,
            private: true,
        }
    }

    /// Valid items are public and strictly inside the duration window
    pub fn is_valid(&self, window: &ValidityWindow) -> bool {
        !self.private
            && window.min_secs < self.duration_secs
            && self.duration_secs < window.max_secs
    }
}

/// Exclusive duration bounds for valid items, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl ValidityWindow {
    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self {
            min_secs: config.min_duration.as_secs(),
            max_secs: config.max_duration.as_secs(),
        }
    }
}

/// Where an item sits inside one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub entry_id: EntryId,
    pub position: usize,
}

/// All membership facts the cache holds for one item
///
/// At most one [`Membership`] per collection, even when the live collection
/// transiently holds duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub item_id: ItemId,
    pub memberships: BTreeMap<CollectionId, Membership>,
    pub current_collection: Option<CollectionId>,
    pub last_synced: Option<DateTime<Utc>>,
}
