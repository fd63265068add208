//! In-process remote with positional semantics
//!
//! Behaves like the hosted service for the operations the organizer uses:
//! inserts shift later entries, repositioning moves one entry, listing
//! reports positions as indices. Failures can be injected per collection
//! (listing) or per item (mutations).

use super::{CollectionAccessor, ItemDetails, RemoteError};
use crate::models::{CollectionEntry, EntryId, Item, ItemId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryCollection {
    title: String,
    entries: Vec<(EntryId, ItemId)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, MemoryCollection>,
    items: HashMap<ItemId, Item>,
    next_entry: u64,
    mutations: usize,
    detail_calls: usize,
    failing_lists: HashSet<String>,
    failing_mutations: HashSet<ItemId>,
}

impl MemoryState {
    fn allocate_entry(&mut self) -> EntryId {
        self.next_entry += 1;
        format!("entry-{}", self.next_entry)
    }

    fn locate(&self, entry_id: &str) -> Option<(String, usize)> {
        self.collections.iter().find_map(|(id, collection)| {
            collection
                .entries
                .iter()
                .position(|(e, _)| e == entry_id)
                .map(|index| (id.clone(), index))
        })
    }

    fn check_mutation(&self, item_id: &str) -> Result<(), RemoteError> {
        if self.failing_mutations.contains(item_id) {
            return Err(RemoteError::Api(500, format!("injected failure for {}", item_id)));
        }
        Ok(())
    }
}

/// Remote collections and item details held in memory
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create (or rename) an empty collection
    pub fn add_collection(&self, collection_id: &str, title: &str) {
        let mut state = self.state();
        let collection = state
            .collections
            .entry(collection_id.to_string())
            .or_default();
        collection.title = title.to_string();
    }

    /// Append an item to a collection, creating the collection if needed
    pub fn push(&self, collection_id: &str, item_id: &str) -> EntryId {
        let mut state = self.state();
        let entry_id = state.allocate_entry();
        let collection = state
            .collections
            .entry(collection_id.to_string())
            .or_insert_with(|| MemoryCollection {
                title: collection_id.to_string(),
                entries: Vec::new(),
            });
        collection.entries.push((entry_id.clone(), item_id.to_string()));
        entry_id
    }

    /// Register item details returned by [`ItemDetails::fetch_items`]
    pub fn put_item(&self, item: Item) {
        self.state().items.insert(item.id.clone(), item);
    }

    /// Item ids of a collection in position order
    pub fn item_ids(&self, collection_id: &str) -> Vec<ItemId> {
        self.state()
            .collections
            .get(collection_id)
            .map(|c| c.entries.iter().map(|(_, item)| item.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of successful inserts, repositions and deletes so far
    pub fn mutation_count(&self) -> usize {
        self.state().mutations
    }

    /// Number of detail lookups served so far
    pub fn detail_calls(&self) -> usize {
        self.state().detail_calls
    }

    /// Make listing `collection_id` fail
    pub fn fail_listing(&self, collection_id: &str) {
        self.state().failing_lists.insert(collection_id.to_string());
    }

    /// Make every mutation touching `item_id` fail
    pub fn fail_mutations_for(&self, item_id: &str) {
        self.state().failing_mutations.insert(item_id.to_string());
    }
}

#[async_trait]
impl CollectionAccessor for MemoryRemote {
    async fn list(&self, collection_id: &str) -> Result<Vec<CollectionEntry>, RemoteError> {
        let state = self.state();
        if state.failing_lists.contains(collection_id) {
            return Err(RemoteError::Network(format!(
                "injected listing failure for {}",
                collection_id
            )));
        }
        let collection = state
            .collections
            .get(collection_id)
            .ok_or_else(|| RemoteError::NotFound(collection_id.to_string()))?;

        Ok(collection
            .entries
            .iter()
            .enumerate()
            .map(|(position, (entry_id, item_id))| CollectionEntry {
                entry_id: entry_id.clone(),
                collection_id: collection_id.to_string(),
                position,
                item_id: item_id.clone(),
                title: state
                    .items
                    .get(item_id)
                    .map(|i| i.title.clone())
                    .unwrap_or_else(|| "Private video".to_string()),
            })
            .collect())
    }

    async fn title(&self, collection_id: &str) -> Result<String, RemoteError> {
        let state = self.state();
        if state.failing_lists.contains(collection_id) {
            return Err(RemoteError::Network(format!(
                "injected listing failure for {}",
                collection_id
            )));
        }
        state
            .collections
            .get(collection_id)
            .map(|c| c.title.clone())
            .ok_or_else(|| RemoteError::NotFound(collection_id.to_string()))
    }

    async fn insert(
        &self,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError> {
        let mut state = self.state();
        state.check_mutation(item_id)?;
        if !state.collections.contains_key(collection_id) {
            return Err(RemoteError::NotFound(collection_id.to_string()));
        }
        let entry_id = state.allocate_entry();
        if let Some(collection) = state.collections.get_mut(collection_id) {
            let position = position.min(collection.entries.len());
            collection
                .entries
                .insert(position, (entry_id.clone(), item_id.to_string()));
        }
        state.mutations += 1;
        Ok(entry_id)
    }

    async fn update_position(
        &self,
        entry_id: &str,
        collection_id: &str,
        item_id: &str,
        position: usize,
    ) -> Result<EntryId, RemoteError> {
        let mut state = self.state();
        state.check_mutation(item_id)?;
        let collection = state
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| RemoteError::NotFound(collection_id.to_string()))?;
        let current = collection
            .entries
            .iter()
            .position(|(e, _)| e == entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;

        let entry = collection.entries.remove(current);
        let position = position.min(collection.entries.len());
        collection.entries.insert(position, entry);
        state.mutations += 1;
        Ok(entry_id.to_string())
    }

    async fn delete(&self, entry_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        let (collection_id, index) = state
            .locate(entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;
        let item_id = state.collections[&collection_id].entries[index].1.clone();
        state.check_mutation(&item_id)?;
        if let Some(collection) = state.collections.get_mut(&collection_id) {
            collection.entries.remove(index);
        }
        state.mutations += 1;
        Ok(())
    }
}

#[async_trait]
impl ItemDetails for MemoryRemote {
    async fn fetch_items(&self, item_ids: &[ItemId]) -> Result<Vec<Item>, RemoteError> {
        let mut state = self.state();
        state.detail_calls += 1;
        Ok(item_ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_with(collection: &str, items: &[&str]) -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.add_collection(collection, "Test");
        for item in items {
            remote.push(collection, item);
        }
        remote
    }

    #[tokio::test]
    async fn test_insert_shifts_later_entries() {
        let remote = remote_with("PL", &["a", "b"]);
        remote.insert("PL", "x", 1).await.unwrap();
        assert_eq!(remote.item_ids("PL"), vec!["a", "x", "b"]);

        remote.insert("PL", "y", 99).await.unwrap();
        assert_eq!(remote.item_ids("PL"), vec!["a", "x", "b", "y"]);
    }

    #[tokio::test]
    async fn test_update_position_moves_entry() {
        let remote = remote_with("PL", &["a", "b", "c"]);
        let listing = remote.list("PL").await.unwrap();
        let c = &listing[2];

        remote.update_position(&c.entry_id, "PL", "c", 0).await.unwrap();
        assert_eq!(remote.item_ids("PL"), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_listing_positions_are_indices() {
        let remote = remote_with("PL", &["a", "b", "c"]);
        let listing = remote.list("PL").await.unwrap();
        let positions: Vec<usize> = listing.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_delete_unknown_entry_is_not_found() {
        let remote = remote_with("PL", &["a"]);
        let result = remote.delete("entry-999").await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
        assert_eq!(remote.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = remote_with("PL", &["a"]);
        remote.fail_listing("PL");
        assert!(remote.list("PL").await.is_err());

        remote.fail_mutations_for("z");
        assert!(remote.insert("PL", "z", 0).await.is_err());
        assert_eq!(remote.mutation_count(), 0);
    }
}
