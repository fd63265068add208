//! Desired-state builder
//!
//! Merges a category's fetched collections into one ranked sequence, then
//! applies the capacity policy to split it into primary, backlog and queue
//! targets.

use crate::models::{
    CollectionId, CollectionRole, CollectionTarget, DesiredState, Entry, Item, ItemId, SourceId,
    ValidityWindow,
};
use crate::ranks::{CategorySpec, RankOrdering, TierRanking};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use ytsort_common::config::OrganizerConfig;

/// An entry together with the metadata needed to rank it
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entry: Entry,
    pub item: Item,
}

/// Primary length bounds and filler cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimits {
    pub max_len: usize,
    pub min_len: usize,
    pub max_fill: usize,
}

impl CapacityLimits {
    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self {
            max_len: config.max_length,
            min_len: config.min_length(),
            max_fill: config.filler_length,
        }
    }
}

/// Result of [`calculate_overflow`]
#[derive(Debug, Clone, PartialEq)]
pub struct Overflow<T> {
    /// Primary sequence, possibly topped up with filler
    pub primary: Vec<T>,
    /// Items cut from the primary sequence, destined for backlog
    pub overflow: Vec<T>,
    /// Filler that was not used
    pub remainder: Vec<T>,
}

/// Apply the capacity policy to a ranked sequence
///
/// A sequence longer than `max_len` is truncated and consumes no filler.
/// Otherwise filler is appended in the order supplied: up to `min_len` (capped
/// by `max_fill`) for short sequences, or `min(max_fill, max_len - len)` for
/// sequences already between the bounds.
pub fn calculate_overflow<T>(
    mut original: Vec<T>,
    mut filler: Vec<T>,
    limits: &CapacityLimits,
) -> Overflow<T> {
    if original.len() > limits.max_len {
        let overflow = original.split_off(limits.max_len);
        return Overflow {
            primary: original,
            overflow,
            remainder: filler,
        };
    }

    let room = if original.len() < limits.min_len {
        (limits.min_len - original.len()).min(limits.max_fill)
    } else {
        limits.max_fill.min(limits.max_len - original.len())
    };

    let remainder = filler.split_off(room.min(filler.len()));
    original.extend(filler);

    Overflow {
        primary: original,
        overflow: Vec::new(),
        remainder,
    }
}

/// Order candidates for a rank
///
/// Candidates are stably sorted oldest first. With [`RankOrdering::Ranked`]
/// they are then grouped by source in the order `members` lists the sources;
/// with [`RankOrdering::Recency`] the timestamp order is kept. Candidates from
/// sources outside `members` are dropped either way.
pub fn order_candidates(
    mut candidates: Vec<Candidate>,
    members: &[SourceId],
    ordering: RankOrdering,
) -> Vec<Candidate> {
    candidates.sort_by_key(|c| c.item.published_at);

    match ordering {
        RankOrdering::Ranked => {
            let mut buckets: HashMap<SourceId, Vec<Candidate>> = HashMap::new();
            for candidate in candidates {
                buckets
                    .entry(candidate.item.source_id.clone())
                    .or_default()
                    .push(candidate);
            }
            members
                .iter()
                .filter_map(|source| buckets.remove(source))
                .flatten()
                .collect()
        }
        RankOrdering::Recency => {
            let members: HashSet<&str> = members.iter().map(String::as_str).collect();
            candidates
                .into_iter()
                .filter(|c| members.contains(c.item.source_id.as_str()))
                .collect()
        }
    }
}

/// One fetched collection, already cleaned of duplicates
#[derive(Debug, Clone)]
pub struct SourceCollection {
    pub role: CollectionRole,
    pub collection_id: CollectionId,
    pub name: String,
    pub entries: Vec<Entry>,
}

impl SourceCollection {
    fn target(&self, category: &str, entries: Vec<Entry>) -> CollectionTarget {
        CollectionTarget {
            category: category.to_string(),
            role: self.role,
            collection_id: self.collection_id.clone(),
            collection_name: self.name.clone(),
            entries,
        }
    }
}

/// The three fetched collections of a category
#[derive(Debug, Clone)]
pub struct CategorySources {
    pub primary: SourceCollection,
    pub queue: SourceCollection,
    pub backlog: SourceCollection,
}

/// Everything the builder reads besides the fetched collections
pub struct BuildInputs<'a> {
    pub category: &'a str,
    pub spec: &'a CategorySpec,
    pub ranking: &'a TierRanking,
    pub items: &'a HashMap<ItemId, Item>,
    pub limits: CapacityLimits,
    pub window: ValidityWindow,
}

/// Keep valid entries with known metadata, first occurrence per item
pub fn valid_candidates(
    sources: &[&SourceCollection],
    items: &HashMap<ItemId, Item>,
    window: &ValidityWindow,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for source in sources {
        for entry in &source.entries {
            let Some(item) = items.get(&entry.item_id) else {
                debug!(item_id = %entry.item_id, "No metadata, skipping");
                continue;
            };
            if !item.is_valid(window) {
                debug!(item_id = %entry.item_id, title = %item.title, "Rejecting invalid item");
                continue;
            }
            if seen.insert(entry.item_id.clone()) {
                candidates.push(Candidate {
                    entry: entry.clone(),
                    item: item.clone(),
                });
            }
        }
    }

    candidates
}

/// Compute the desired state of a category
///
/// Primary takes the ranked candidates (plus filler) up to capacity; backlog
/// takes the overflow followed by unused filler; queue keeps whatever of its
/// current entries was placed nowhere else. The three targets are disjoint.
pub fn build_desired_state(sources: &CategorySources, inputs: &BuildInputs<'_>) -> DesiredState {
    let merged = valid_candidates(
        &[&sources.primary, &sources.queue, &sources.backlog],
        inputs.items,
        &inputs.window,
    );

    let rank = inputs.spec.rank.as_deref().unwrap_or(inputs.category);
    let members = inputs.ranking.members_of(rank);
    let ranked = order_candidates(merged.clone(), &members, inputs.spec.ordering);

    let filler = match inputs.spec.filler_rank.as_deref() {
        Some(filler_rank) => {
            let ranked_ids: HashSet<&str> = ranked.iter().map(|c| c.item.id.as_str()).collect();
            let filler_members = inputs.ranking.members_of(filler_rank);
            order_candidates(merged, &filler_members, RankOrdering::Recency)
                .into_iter()
                .filter(|c| !ranked_ids.contains(c.item.id.as_str()))
                .collect()
        }
        None => Vec::new(),
    };

    info!(
        category = %inputs.category,
        ranked = ranked.len(),
        filler = filler.len(),
        "Ranked candidates"
    );

    let split = calculate_overflow(ranked, filler, &inputs.limits);

    let mut placed: HashSet<ItemId> = HashSet::new();
    let mut take = |candidates: Vec<Candidate>| -> Vec<Entry> {
        candidates
            .into_iter()
            .filter(|c| placed.insert(c.item.id.clone()))
            .map(|c| c.entry)
            .collect()
    };

    let primary = take(split.primary);
    let mut backlog = take(split.overflow);
    backlog.extend(take(split.remainder));

    let queue: Vec<Entry> = sources
        .queue
        .entries
        .iter()
        .filter(|e| placed.insert(e.item_id.clone()))
        .cloned()
        .collect();

    info!(
        category = %inputs.category,
        primary = primary.len(),
        backlog = backlog.len(),
        queue = queue.len(),
        "Built desired state"
    );

    DesiredState {
        category: inputs.category.to_string(),
        primary: sources.primary.target(inputs.category, primary),
        backlog: sources.backlog.target(inputs.category, backlog),
        queue: sources.queue.target(inputs.category, queue),
    }
}
