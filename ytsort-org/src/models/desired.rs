//! Desired state of one category's three collections

use super::{CollectionId, Entry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The part a collection plays in a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionRole {
    Primary,
    Backlog,
    Queue,
}

impl CollectionRole {
    /// Backlog collections never lose items and ignore ordering
    pub fn is_backlog(self) -> bool {
        matches!(self, CollectionRole::Backlog)
    }

    /// Queue collections take imports at the head and ignore ordering
    pub fn is_queue(self) -> bool {
        matches!(self, CollectionRole::Queue)
    }

    /// Whether position mismatches count as corrections
    pub fn tracks_order(self) -> bool {
        matches!(self, CollectionRole::Primary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionRole::Primary => "primary",
            CollectionRole::Backlog => "backlog",
            CollectionRole::Queue => "queue",
        }
    }
}

impl fmt::Display for CollectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(CollectionRole::Primary),
            "backlog" => Ok(CollectionRole::Backlog),
            "queue" => Ok(CollectionRole::Queue),
            other => Err(format!("unknown collection role: {}", other)),
        }
    }
}

/// Ordered desired contents of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTarget {
    pub category: String,
    pub role: CollectionRole,
    pub collection_id: CollectionId,
    pub collection_name: String,
    pub entries: Vec<Entry>,
}

impl CollectionTarget {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Desired contents of a category, primary/backlog/queue disjoint by item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub category: String,
    pub primary: CollectionTarget,
    pub backlog: CollectionTarget,
    pub queue: CollectionTarget,
}

impl DesiredState {
    /// Targets in reconciliation order: primary, queue, backlog
    pub fn targets(&self) -> [&CollectionTarget; 3] {
        [&self.primary, &self.queue, &self.backlog]
    }
}
