//! Sequencer
//!
//! Turns a starting sequence into an ending sequence with import, update
//! (reposition) and remove operations. Planning simulates every operation on
//! an interim copy of the starting sequence so later decisions see earlier
//! effects; execution then replays the plan against the remote in order.

use crate::duplicates::{identify_duplicates, remove_duplicates, without_duplicates};
use crate::error::{Error, Result};
use crate::models::{CollectionId, CollectionRole, Entry, EntryId, ItemId, Membership};
use crate::remote::RemoteError;
use crate::OrganizerContext;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One remote mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert an item that currently lives in another collection
    Import {
        item_id: ItemId,
        title: String,
        source_collection: CollectionId,
        position: usize,
    },
    /// Move an entry already in the destination
    Update {
        item_id: ItemId,
        title: String,
        entry_id: EntryId,
        position: usize,
    },
    /// Remove an entry absent from the ending sequence
    Remove {
        item_id: ItemId,
        title: String,
        entry_id: EntryId,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Import { .. } => "import",
            Operation::Update { .. } => "update",
            Operation::Remove { .. } => "remove",
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            Operation::Import { item_id, .. }
            | Operation::Update { item_id, .. }
            | Operation::Remove { item_id, .. } => item_id,
        }
    }
}

/// Index into [`Interim::slots`]
type SlotId = usize;

/// Mutable simulation of the destination collection
///
/// Entries live in an append-only arena; the current sequence is an order
/// vector of slot ids, so moves and inserts only shuffle indices.
struct Interim {
    slots: Vec<Entry>,
    order: Vec<SlotId>,
}

impl Interim {
    fn new(entries: Vec<Entry>) -> Self {
        let order = (0..entries.len()).collect();
        Self {
            slots: entries,
            order,
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn at(&self, index: usize) -> &Entry {
        &self.slots[self.order[index]]
    }

    /// Current index of `item_id` anywhere in the sequence
    fn position(&self, item_id: &str) -> Option<usize> {
        (0..self.order.len()).find(|&i| self.at(i).item_id == item_id)
    }

    fn insert(&mut self, index: usize, entry: Entry) {
        let slot = self.slots.len();
        self.slots.push(entry);
        self.order.insert(index.min(self.order.len()), slot);
    }

    fn move_to(&mut self, from: usize, to: usize) {
        let slot = self.order.remove(from);
        self.order.insert(to.min(self.order.len()), slot);
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().map(|&slot| &self.slots[slot])
    }
}

/// Classified operations for one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePlan {
    pub destination: CollectionId,
    pub role: CollectionRole,
    pub operations: Vec<Operation>,
    /// Positions of the ending sequence that needed no operation
    pub unchanged: usize,
    /// Final simulated item order
    pub expected: Vec<ItemId>,
}

impl SequencePlan {
    pub fn count(&self, kind: &str) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }
}

/// Plan the operations turning `start` into `end` inside `destination`
///
/// Both sequences are expected to be duplicate-free. Imports go to the
/// current index, or the head for backlog and queue. An ending entry sourced
/// from the destination but missing from the whole interim copy is skipped,
/// and later entries shift up to fill its slot.
pub fn plan_sequence(
    start: Vec<Entry>,
    end: &[Entry],
    destination: &str,
    role: CollectionRole,
) -> SequencePlan {
    let mut interim = Interim::new(start);
    let mut operations = Vec::new();
    let mut unchanged = 0;
    let mut skipped = 0;
    let head_imports = role.is_backlog() || role.is_queue();

    for (i, wanted) in end.iter().enumerate() {
        let index = i - skipped;
        if index < interim.len() && interim.at(index).item_id == wanted.item_id {
            unchanged += 1;
            continue;
        }

        if !wanted.is_from(destination) {
            let position = if head_imports {
                0
            } else {
                index.min(interim.len())
            };
            operations.push(Operation::Import {
                item_id: wanted.item_id.clone(),
                title: wanted.title.clone(),
                source_collection: wanted.source.collection_id.clone(),
                position,
            });
            interim.insert(position, wanted.clone());
            continue;
        }

        match interim.position(&wanted.item_id) {
            Some(current) => {
                let entry_id = interim.at(current).source.entry_id.clone();
                operations.push(Operation::Update {
                    item_id: wanted.item_id.clone(),
                    title: wanted.title.clone(),
                    entry_id,
                    position: index,
                });
                interim.move_to(current, index);
            }
            None => {
                skipped += 1;
                warn!(
                    item_id = %wanted.item_id,
                    title = %wanted.title,
                    collection_id = %destination,
                    index = i,
                    "Desired entry belongs to destination but is not present, skipping"
                );
            }
        }
    }

    if !role.is_backlog() {
        let wanted: HashSet<&str> = end.iter().map(|e| e.item_id.as_str()).collect();
        for entry in interim.entries() {
            if !wanted.contains(entry.item_id.as_str()) {
                operations.push(Operation::Remove {
                    item_id: entry.item_id.clone(),
                    title: entry.title.clone(),
                    entry_id: entry.source.entry_id.clone(),
                });
            }
        }
    }

    let removed: HashSet<&str> = operations
        .iter()
        .filter_map(|op| match op {
            Operation::Remove { entry_id, .. } => Some(entry_id.as_str()),
            _ => None,
        })
        .collect();
    let expected = interim
        .entries()
        .filter(|e| !removed.contains(e.source.entry_id.as_str()))
        .map(|e| e.item_id.clone())
        .collect();

    SequencePlan {
        destination: destination.to_string(),
        role,
        operations,
        unchanged,
        expected,
    }
}

/// What a sequencer run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub duplicates_removed: usize,
    pub imported: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Repositions skipped because the destination ignores order
    pub suppressed: usize,
}

impl SequenceReport {
    pub fn operations(&self) -> usize {
        self.imported + self.updated + self.removed
    }
}

/// Deduplicate, plan and execute against the remote
///
/// Operations run strictly in plan order, each followed by its cache update.
/// The first failed mutation stops the run; nothing is rolled back.
pub async fn run_sequencer(
    ctx: &OrganizerContext,
    start: Vec<Entry>,
    end: Vec<Entry>,
    destination: &str,
    role: CollectionRole,
) -> Result<SequenceReport> {
    let mut report = SequenceReport::default();

    let interim_duplicates = identify_duplicates(&start, None);
    report.duplicates_removed += remove_duplicates(ctx, &interim_duplicates).await?;
    let start = without_duplicates(start, &interim_duplicates);

    let ending_duplicates = identify_duplicates(&start, Some(&end));
    report.duplicates_removed += remove_duplicates(ctx, &ending_duplicates).await?;
    let end = without_duplicates(end, &ending_duplicates);

    let plan = plan_sequence(start, &end, destination, role);
    report.unchanged = plan.unchanged;

    info!(
        collection_id = %destination,
        role = %role,
        imports = plan.count("import"),
        updates = plan.count("update"),
        removes = plan.count("remove"),
        unchanged = plan.unchanged,
        dry_run = ctx.dry_run(),
        "Planned sequence"
    );

    for operation in &plan.operations {
        if matches!(operation, Operation::Update { .. }) && !role.tracks_order() {
            debug!(
                collection_id = %destination,
                item_id = %operation.item_id(),
                "Reposition suppressed, collection ignores order"
            );
            report.suppressed += 1;
            continue;
        }

        if ctx.dry_run() {
            info!(
                collection_id = %destination,
                operation = operation.kind(),
                item_id = %operation.item_id(),
                "[dry-run] Would apply"
            );
        } else {
            apply(ctx, destination, operation).await?;
        }

        match operation {
            Operation::Import { .. } => report.imported += 1,
            Operation::Update { .. } => report.updated += 1,
            Operation::Remove { .. } => report.removed += 1,
        }
    }

    Ok(report)
}

fn failed(operation: &'static str, item_id: &str) -> impl FnOnce(RemoteError) -> Error {
    let item_id = item_id.to_string();
    move |source| Error::RemoteMutation {
        operation,
        item_id,
        source,
    }
}

async fn apply(ctx: &OrganizerContext, destination: &str, operation: &Operation) -> Result<()> {
    match operation {
        Operation::Import {
            item_id,
            title,
            source_collection,
            position,
        } => {
            let entry_id = ctx
                .accessor
                .insert(destination, item_id, *position)
                .await
                .map_err(failed("import", item_id))?;
            ctx.cache
                .set_membership(
                    item_id,
                    destination,
                    Membership {
                        entry_id,
                        position: *position,
                    },
                )
                .await?;
            info!(
                item_id = %item_id,
                title = %title,
                from = %source_collection,
                collection_id = %destination,
                position,
                "Imported"
            );
        }
        Operation::Update {
            item_id,
            title,
            entry_id,
            position,
        } => {
            let entry_id = ctx
                .accessor
                .update_position(entry_id, destination, item_id, *position)
                .await
                .map_err(failed("update", item_id))?;
            ctx.cache
                .set_membership(
                    item_id,
                    destination,
                    Membership {
                        entry_id,
                        position: *position,
                    },
                )
                .await?;
            info!(
                item_id = %item_id,
                title = %title,
                collection_id = %destination,
                position,
                "Repositioned"
            );
        }
        Operation::Remove {
            item_id,
            title,
            entry_id,
        } => {
            ctx.accessor
                .delete(entry_id)
                .await
                .map_err(failed("remove", item_id))?;
            ctx.cache.clear_membership(item_id, destination).await?;
            info!(
                item_id = %item_id,
                title = %title,
                collection_id = %destination,
                "Removed"
            );
        }
    }

    Ok(())
}
