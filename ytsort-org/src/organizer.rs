//! Category pipeline
//!
//! `organize_category` runs a full pass for one category: fetch the three
//! collections, drop invalid items from each, resolve duplicates, build and
//! persist the desired state, reconcile each collection, then clean primary
//! items out of the backlog.

use crate::builder::{build_desired_state, BuildInputs, CategorySources, SourceCollection};
use crate::controller::{reconcile, verify, ReconcileReport, Verification};
use crate::duplicates::{identify_duplicates, remove_duplicates, without_duplicates};
use crate::error::{Error, Result};
use crate::models::{entry::entries_from_listing, CollectionRole, CollectionTarget, ItemId};
use crate::ranks::TierRanking;
use crate::OrganizerContext;
use std::collections::BTreeMap;
use tracing::info;

/// Summary of one category pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeReport {
    pub category: String,
    pub shorts_removed: usize,
    pub duplicates_removed: usize,
    pub primary_len: usize,
    pub backlog_len: usize,
    pub queue_len: usize,
    pub reconciled: Vec<ReconcileReport>,
    pub backlog_cleaned: usize,
}

/// Fetch a collection's name and entries; any failure is fatal to the pass
pub async fn fetch_source(
    ctx: &OrganizerContext,
    role: CollectionRole,
    collection_id: &str,
) -> Result<SourceCollection> {
    let fetch_failed = |source| Error::SourceFetch {
        collection_id: collection_id.to_string(),
        source,
    };

    let name = ctx.accessor.title(collection_id).await.map_err(fetch_failed)?;
    let listing = ctx.accessor.list(collection_id).await.map_err(fetch_failed)?;

    info!(
        collection_id = %collection_id,
        role = %role,
        name = %name,
        entries = listing.len(),
        "Fetched collection"
    );

    Ok(SourceCollection {
        role,
        collection_id: collection_id.to_string(),
        entries: entries_from_listing(listing, &name),
        name,
    })
}

/// Remove invalid items (too short, too long, private, unavailable)
///
/// Returns the collection without them and how many were removed.
pub async fn remove_shorts(
    ctx: &OrganizerContext,
    mut source: SourceCollection,
) -> Result<(SourceCollection, usize)> {
    let ids: Vec<ItemId> = source.entries.iter().map(|e| e.item_id.clone()).collect();
    let items = ctx.cache.lookup_many(&ids, true).await?;
    let window = ctx.settings.window;

    let (keep, reject): (Vec<_>, Vec<_>) = source.entries.into_iter().partition(|entry| {
        items
            .get(&entry.item_id)
            .map(|item| item.is_valid(&window))
            .unwrap_or(false)
    });

    for entry in &reject {
        if ctx.dry_run() {
            info!(
                item_id = %entry.item_id,
                title = %entry.title,
                collection_id = %source.collection_id,
                "[dry-run] Would remove invalid item"
            );
            continue;
        }

        ctx.accessor
            .delete(&entry.source.entry_id)
            .await
            .map_err(|e| Error::RemoteMutation {
                operation: "delete",
                item_id: entry.item_id.clone(),
                source: e,
            })?;
        ctx.cache
            .clear_membership(&entry.item_id, &source.collection_id)
            .await?;
        info!(
            item_id = %entry.item_id,
            title = %entry.title,
            collection_id = %source.collection_id,
            "Removed invalid item"
        );
    }

    source.entries = keep;
    Ok((source, reject.len()))
}

/// Remove repeated items inside one fetched collection
pub async fn dedupe_source(
    ctx: &OrganizerContext,
    mut source: SourceCollection,
) -> Result<(SourceCollection, usize)> {
    let duplicates = identify_duplicates(&source.entries, None);
    let removed = remove_duplicates(ctx, &duplicates).await?;
    source.entries = without_duplicates(source.entries, &duplicates);
    Ok((source, removed))
}

/// Remove backlog copies of items that are also in primary
pub async fn clean_backlog(
    ctx: &OrganizerContext,
    primary_id: &str,
    backlog_id: &str,
) -> Result<usize> {
    let primary = fetch_source(ctx, CollectionRole::Primary, primary_id).await?;
    let backlog = fetch_source(ctx, CollectionRole::Backlog, backlog_id).await?;

    let mut combined = primary.entries;
    combined.extend(backlog.entries);

    let duplicates = identify_duplicates(&combined, None);
    let removed = remove_duplicates(ctx, &duplicates).await?;
    info!(
        primary = %primary_id,
        backlog = %backlog_id,
        removed,
        "Cleaned backlog"
    );
    Ok(removed)
}

/// Full build and reconcile pass for one category
pub async fn organize_category(
    ctx: &OrganizerContext,
    ranking: &TierRanking,
    category: &str,
) -> Result<OrganizeReport> {
    let spec = ranking.category(category)?;
    info!(category = %category, dry_run = ctx.dry_run(), "Organizing category");

    let primary = fetch_source(ctx, CollectionRole::Primary, &spec.primary).await?;
    let queue = fetch_source(ctx, CollectionRole::Queue, &spec.queue).await?;
    let backlog = fetch_source(ctx, CollectionRole::Backlog, &spec.backlog).await?;

    let mut shorts_removed = 0;
    let (primary, removed) = remove_shorts(ctx, primary).await?;
    shorts_removed += removed;
    let (queue, removed) = remove_shorts(ctx, queue).await?;
    shorts_removed += removed;
    let (backlog, removed) = remove_shorts(ctx, backlog).await?;
    shorts_removed += removed;

    let mut duplicates_removed = 0;
    let (primary, removed) = dedupe_source(ctx, primary).await?;
    duplicates_removed += removed;
    let (queue, removed) = dedupe_source(ctx, queue).await?;
    duplicates_removed += removed;
    let (backlog, removed) = dedupe_source(ctx, backlog).await?;
    duplicates_removed += removed;

    let sources = CategorySources {
        primary,
        queue,
        backlog,
    };
    let ids: Vec<ItemId> = [&sources.primary, &sources.queue, &sources.backlog]
        .iter()
        .flat_map(|s| s.entries.iter().map(|e| e.item_id.clone()))
        .collect();
    let items = ctx.cache.lookup_many(&ids, true).await?;

    let state = build_desired_state(
        &sources,
        &BuildInputs {
            category,
            spec,
            ranking,
            items: &items,
            limits: ctx.settings.limits,
            window: ctx.settings.window,
        },
    );
    ctx.store.save_desired_state(&state).await?;

    let mut reconciled = Vec::with_capacity(3);
    for target in state.targets() {
        reconciled.push(reconcile(ctx, target).await?);
    }

    let backlog_cleaned = clean_backlog(ctx, &spec.primary, &spec.backlog).await?;

    Ok(OrganizeReport {
        category: category.to_string(),
        shorts_removed,
        duplicates_removed,
        primary_len: state.primary.len(),
        backlog_len: state.backlog.len(),
        queue_len: state.queue.len(),
        reconciled,
        backlog_cleaned,
    })
}

/// Verify a category against its persisted desired state without correcting
pub async fn verify_category(
    ctx: &OrganizerContext,
    category: &str,
) -> Result<Vec<(CollectionTarget, Verification)>> {
    let targets = ctx.store.load_category(category).await?;
    if targets.is_empty() {
        return Err(Error::Config(format!(
            "No desired state recorded for category {}",
            category
        )));
    }

    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let verification = verify(ctx, &target).await?;
        ctx.store
            .record_corrections(&target.collection_id, 0, &verification.corrections)
            .await?;
        results.push((target, verification));
    }
    Ok(results)
}

/// A collection's items counted per source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub collection_id: String,
    pub name: String,
    pub total: usize,
    /// Source title to item count, for items with known metadata
    pub by_source: BTreeMap<String, usize>,
    /// Private or unavailable items
    pub unavailable: usize,
}

pub async fn summarize_collection(
    ctx: &OrganizerContext,
    role: CollectionRole,
    collection_id: &str,
) -> Result<CollectionSummary> {
    let source = fetch_source(ctx, role, collection_id).await?;
    let ids: Vec<ItemId> = source.entries.iter().map(|e| e.item_id.clone()).collect();
    let items = ctx.cache.lookup_many(&ids, true).await?;

    let mut by_source = BTreeMap::new();
    let mut unavailable = 0;
    for entry in &source.entries {
        match items.get(&entry.item_id) {
            Some(item) if !item.private => {
                *by_source.entry(item.source_title.clone()).or_insert(0) += 1;
            }
            _ => unavailable += 1,
        }
    }

    Ok(CollectionSummary {
        collection_id: source.collection_id,
        name: source.name,
        total: source.entries.len(),
        by_source,
        unavailable,
    })
}
