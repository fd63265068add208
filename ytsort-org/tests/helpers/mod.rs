//! Test Helper Utilities
//!
//! Shared setup for ytsort-org integration tests: an in-memory remote, an
//! in-memory SQLite cache and state store, and item builders.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use ytsort_common::db::init_memory_database;
use ytsort_org::builder::CapacityLimits;
use ytsort_org::cache::SqliteRecordCache;
use ytsort_org::models::{CollectionRole, CollectionTarget, Entry, Item, ValidityWindow};
use ytsort_org::remote::{CollectionAccessor, DetailFetchPlan, MemoryRemote};
use ytsort_org::store::StateStore;
use ytsort_org::{OrganizerContext, OrganizerSettings};

pub struct Harness {
    pub remote: Arc<MemoryRemote>,
    pub cache: Arc<SqliteRecordCache>,
    pub store: StateStore,
    pub ctx: OrganizerContext,
}

pub fn settings(max_len: usize, min_len: usize, max_fill: usize) -> OrganizerSettings {
    OrganizerSettings {
        limits: CapacityLimits {
            max_len,
            min_len,
            max_fill,
        },
        window: ValidityWindow {
            min_secs: 60,
            max_secs: 3600,
        },
        max_iterations: 5,
        verify_wait: Duration::ZERO,
        dry_run: false,
    }
}

pub async fn harness(settings: OrganizerSettings) -> Harness {
    let pool = init_memory_database().await.expect("memory database");
    let remote = Arc::new(MemoryRemote::new());
    let cache = Arc::new(SqliteRecordCache::new(
        pool.clone(),
        remote.clone(),
        DetailFetchPlan {
            chunk_size: 50,
            workers: 2,
            start_delay: Duration::ZERO,
        },
    ));
    let store = StateStore::new(pool);
    let ctx = OrganizerContext::new(remote.clone(), cache.clone(), store.clone(), settings);

    Harness {
        remote,
        cache,
        store,
        ctx,
    }
}

/// A valid five-minute item published on `day` of January 2024
pub fn item(id: &str, source: &str, day: u32) -> Item {
    Item {
        id: id.to_string(),
        title: format!("Item {id}"),
        source_id: source.to_string(),
        source_title: format!("Channel {source}"),
        duration_secs: 300,
        published_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        private: false,
    }
}

/// Create a collection holding `items` in order, registering item details
pub fn seed(remote: &MemoryRemote, collection_id: &str, items: &[&str]) {
    remote.add_collection(collection_id, &format!("{collection_id} list"));
    for id in items {
        remote.push(collection_id, id);
    }
}

/// Entries of a live collection with provenance
pub async fn live_entries(remote: &MemoryRemote, collection_id: &str) -> Vec<Entry> {
    let listing = remote.list(collection_id).await.expect("listing");
    listing
        .into_iter()
        .map(|e| e.into_entry(&format!("{collection_id} list")))
        .collect()
}

/// Target whose entries are looked up by item id across the given collections
pub async fn target(
    remote: &MemoryRemote,
    collection_id: &str,
    role: CollectionRole,
    wanted: &[(&str, &str)],
) -> CollectionTarget {
    let mut entries = Vec::new();
    for (item_id, from) in wanted {
        let found = live_entries(remote, from)
            .await
            .into_iter()
            .find(|e| e.item_id == *item_id)
            .expect("wanted item present in its source collection");
        entries.push(found);
    }

    CollectionTarget {
        category: "test".to_string(),
        role,
        collection_id: collection_id.to_string(),
        collection_name: format!("{collection_id} list"),
        entries,
    }
}
