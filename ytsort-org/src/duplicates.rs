//! Duplicate resolver
//!
//! For every distinct item of a reference sequence, all occurrences in the
//! search sequence except one are marked for removal. The kept occurrence is
//! the lowest source position within the collection where the item is first
//! seen in search order; with a single collection that is simply the lowest
//! position. A remote entry is never marked twice.

use crate::error::{Error, Result};
use crate::models::{CollectionId, Entry, EntryId, ItemId};
use crate::OrganizerContext;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// One surplus occurrence scheduled for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub item_id: ItemId,
    pub title: String,
    pub collection_id: CollectionId,
    pub entry_id: EntryId,
    pub position: usize,
}

/// Surplus occurrences grouped by collection, then by item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateGroups {
    groups: BTreeMap<CollectionId, BTreeMap<ItemId, Vec<Duplicate>>>,
}

impl DuplicateGroups {
    fn push(&mut self, duplicate: Duplicate) {
        self.groups
            .entry(duplicate.collection_id.clone())
            .or_default()
            .entry(duplicate.item_id.clone())
            .or_default()
            .push(duplicate);
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Duplicate> {
        self.groups.values().flat_map(|items| items.values().flatten())
    }

    pub fn entry_ids(&self) -> HashSet<EntryId> {
        self.iter().map(|d| d.entry_id.clone()).collect()
    }
}

/// Find surplus occurrences in `search` (defaults to `reference`)
pub fn identify_duplicates(reference: &[Entry], search: Option<&[Entry]>) -> DuplicateGroups {
    let search = search.unwrap_or(reference);
    let mut groups = DuplicateGroups::default();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut marked: HashSet<&str> = HashSet::new();

    for reference_entry in reference {
        if !visited.insert(reference_entry.item_id.as_str()) {
            continue;
        }

        let occurrences: Vec<&Entry> = search
            .iter()
            .filter(|e| e.item_id == reference_entry.item_id)
            .collect();
        if occurrences.len() < 2 {
            continue;
        }

        let home = &occurrences[0].source.collection_id;
        let Some(kept) = occurrences
            .iter()
            .filter(|e| &e.source.collection_id == home)
            .min_by_key(|e| e.source.position)
        else {
            continue;
        };

        for occurrence in &occurrences {
            let entry_id = occurrence.source.entry_id.as_str();
            if entry_id == kept.source.entry_id || !marked.insert(entry_id) {
                continue;
            }
            groups.push(Duplicate {
                item_id: occurrence.item_id.clone(),
                title: occurrence.title.clone(),
                collection_id: occurrence.source.collection_id.clone(),
                entry_id: entry_id.to_string(),
                position: occurrence.source.position,
            });
        }
    }

    if !groups.is_empty() {
        debug!(duplicates = groups.len(), "Identified duplicate entries");
    }
    groups
}

/// Delete every marked entry from the remote and clear its membership
///
/// Returns the number of entries removed (or that would be removed in dry-run).
/// Stops at the first failed delete; earlier deletes stay applied.
pub async fn remove_duplicates(ctx: &OrganizerContext, groups: &DuplicateGroups) -> Result<usize> {
    let mut removed = 0;

    for duplicate in groups.iter() {
        if ctx.dry_run() {
            info!(
                item_id = %duplicate.item_id,
                title = %duplicate.title,
                collection_id = %duplicate.collection_id,
                position = duplicate.position,
                "[dry-run] Would remove duplicate"
            );
            removed += 1;
            continue;
        }

        ctx.accessor
            .delete(&duplicate.entry_id)
            .await
            .map_err(|source| Error::RemoteMutation {
                operation: "delete",
                item_id: duplicate.item_id.clone(),
                source,
            })?;
        ctx.cache
            .clear_membership(&duplicate.item_id, &duplicate.collection_id)
            .await?;

        info!(
            item_id = %duplicate.item_id,
            title = %duplicate.title,
            collection_id = %duplicate.collection_id,
            position = duplicate.position,
            "Removed duplicate"
        );
        removed += 1;
    }

    Ok(removed)
}

/// Drop marked entries from an in-memory sequence
pub fn without_duplicates(entries: Vec<Entry>, groups: &DuplicateGroups) -> Vec<Entry> {
    if groups.is_empty() {
        return entries;
    }
    let marked = groups.entry_ids();
    entries
        .into_iter()
        .filter(|e| !marked.contains(&e.source.entry_id))
        .collect()
}
