//! Collection entries and their provenance

use super::{CollectionId, EntryId, ItemId};
use serde::{Deserialize, Serialize};

/// A remote collection's view of an item at a position
///
/// Fetched fresh on every listing and never cached beyond the membership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub entry_id: EntryId,
    pub collection_id: CollectionId,
    pub position: usize,
    pub item_id: ItemId,
    /// Title as shown in the listing ("Private video" for hidden items)
    pub title: String,
}

impl CollectionEntry {
    /// Attach provenance, naming the collection the entry was listed from
    pub fn into_entry(self, collection_name: &str) -> Entry {
        Entry {
            item_id: self.item_id,
            title: self.title,
            source: Provenance {
                collection_id: self.collection_id,
                collection_name: collection_name.to_string(),
                position: self.position,
                entry_id: self.entry_id,
            },
        }
    }
}

/// Where an entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub collection_id: CollectionId,
    pub collection_name: String,
    pub position: usize,
    /// Remote entry in the source collection
    pub entry_id: EntryId,
}

/// An item placed in an ordered sequence, annotated with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub item_id: ItemId,
    pub title: String,
    pub source: Provenance,
}

impl Entry {
    pub fn is_from(&self, collection_id: &str) -> bool {
        self.source.collection_id == collection_id
    }
}

/// Convert a listing into provenance-annotated entries
pub fn entries_from_listing(listing: Vec<CollectionEntry>, collection_name: &str) -> Vec<Entry> {
    listing
        .into_iter()
        .map(|e| e.into_entry(collection_name))
        .collect()
}
