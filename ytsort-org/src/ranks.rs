//! Tier ranking and category definitions
//!
//! The ranks file names sources (channels), groups them into nested tiers,
//! and declares each category's three managed collections:
//!
//! ```toml
//! [channels]
//! "Some Channel" = "UCxxxxxxxx"
//!
//! [[tiers]]
//! name = "music"
//! channels = ["Some Channel"]
//!
//! [[tiers.tiers]]
//! name = "music-extra"
//! channels = ["UCyyyyyyyy"]
//!
//! [categories.music]
//! primary = "PLprimary"
//! queue = "PLqueue"
//! backlog = "PLbacklog"
//! filler_rank = "music-extra"
//! ordering = "ranked"
//! ```
//!
//! Tier members are channel names from `[channels]` or raw source ids.

use crate::error::{Error, Result};
use crate::models::{CollectionId, SourceId};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// How a category's primary candidates are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrdering {
    /// Grouped by source in rank order, recency within each source
    #[default]
    Ranked,
    /// Recency only, across all sources in the rank
    Recency,
}

/// One named tier: its own sources, then its subtiers
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

/// The managed collections and ranking choices of one category
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySpec {
    pub primary: CollectionId,
    pub queue: CollectionId,
    pub backlog: CollectionId,
    /// Rank whose sources feed the primary collection (defaults to the category name)
    #[serde(default)]
    pub rank: Option<String>,
    /// Rank whose sources supply filler
    #[serde(default)]
    pub filler_rank: Option<String>,
    #[serde(default)]
    pub ordering: RankOrdering,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RanksFile {
    #[serde(default)]
    channels: BTreeMap<String, SourceId>,
    #[serde(default)]
    tiers: Vec<Tier>,
    #[serde(default)]
    categories: BTreeMap<String, CategorySpec>,
}

/// Nested grouping of sources into named ranks
#[derive(Debug, Clone, Default)]
pub struct TierRanking {
    channels: BTreeMap<String, SourceId>,
    tiers: Vec<Tier>,
    categories: BTreeMap<String, CategorySpec>,
}

impl TierRanking {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read ranks file {}: {}", path.display(), e))
        })?;
        let ranking = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            tiers = ranking.tiers.len(),
            categories = ranking.categories.len(),
            "Loaded ranks file"
        );
        Ok(ranking)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: RanksFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse ranks file: {}", e)))?;
        Ok(Self {
            channels: file.channels,
            tiers: file.tiers,
            categories: file.categories,
        })
    }

    /// Ordered member sources of `rank`; empty when the rank is unknown
    ///
    /// A tier's own channels come first, then each subtier depth-first.
    /// Repeated sources keep their first position.
    pub fn members_of(&self, rank: &str) -> Vec<SourceId> {
        let Some(tier) = find_tier(&self.tiers, rank) else {
            warn!(rank = %rank, "Unknown rank, no member sources");
            return Vec::new();
        };

        let mut members = Vec::new();
        let mut seen = HashSet::new();
        self.flatten(tier, &mut members, &mut seen);
        members
    }

    fn flatten(&self, tier: &Tier, members: &mut Vec<SourceId>, seen: &mut HashSet<SourceId>) {
        for channel in &tier.channels {
            let source = self
                .channels
                .get(channel)
                .cloned()
                .unwrap_or_else(|| channel.clone());
            if seen.insert(source.clone()) {
                members.push(source);
            }
        }
        for sub in &tier.tiers {
            self.flatten(sub, members, seen);
        }
    }

    pub fn category(&self, name: &str) -> Result<&CategorySpec> {
        self.categories
            .get(name)
            .ok_or_else(|| Error::UnknownCategory(name.to_string()))
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Display name for a source id, if the channels map knows it
    pub fn source_name(&self, source_id: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|(_, id)| id.as_str() == source_id)
            .map(|(name, _)| name.as_str())
    }
}

fn find_tier<'a>(tiers: &'a [Tier], name: &str) -> Option<&'a Tier> {
    for tier in tiers {
        if tier.name == name {
            return Some(tier);
        }
        if let Some(found) = find_tier(&tier.tiers, name) {
            return Some(found);
        }
    }
    None
}
