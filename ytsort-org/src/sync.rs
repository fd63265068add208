//! Cache synchronisation with live collections

use crate::error::{Error, Result};
use crate::models::{ItemId, Membership};
use crate::OrganizerContext;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub collection_id: String,
    /// Distinct items found live
    pub present: usize,
    /// Stale memberships cleared
    pub cleared: usize,
    /// Live entries beyond the first occurrence of their item
    pub duplicates: usize,
}

/// Make the cache's memberships for `collection_id` match the live listing
///
/// Every live item gets a fresh membership (first occurrence wins) and its
/// metadata is fetched if unknown; cached members no longer live are cleared.
pub async fn sync_collection(ctx: &OrganizerContext, collection_id: &str) -> Result<SyncReport> {
    let listing = ctx
        .accessor
        .list(collection_id)
        .await
        .map_err(|source| Error::SourceFetch {
            collection_id: collection_id.to_string(),
            source,
        })?;

    let ids: Vec<ItemId> = listing.iter().map(|e| e.item_id.clone()).collect();
    ctx.cache.lookup_many(&ids, true).await?;

    let mut report = SyncReport {
        collection_id: collection_id.to_string(),
        ..SyncReport::default()
    };
    let mut live: HashSet<&str> = HashSet::new();

    for entry in &listing {
        if !live.insert(entry.item_id.as_str()) {
            report.duplicates += 1;
            continue;
        }
        ctx.cache
            .set_membership(
                &entry.item_id,
                collection_id,
                Membership {
                    entry_id: entry.entry_id.clone(),
                    position: entry.position,
                },
            )
            .await?;
    }
    report.present = live.len();

    for item_id in ctx.cache.collection_members(collection_id).await? {
        if !live.contains(item_id.as_str()) {
            debug!(item_id = %item_id, collection_id = %collection_id, "Clearing stale membership");
            ctx.cache.clear_membership(&item_id, collection_id).await?;
            report.cleared += 1;
        }
    }

    info!(
        collection_id = %collection_id,
        present = report.present,
        cleared = report.cleared,
        duplicates = report.duplicates,
        "Synced cache with collection"
    );
    Ok(report)
}
