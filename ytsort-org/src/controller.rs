//! Verification and correction controller
//!
//! Drives one collection towards its persisted target:
//!
//! ```text
//! Verify --(no corrections)--> Converged
//!   |  ^
//!   v  |
//! Correct        Verify --(iteration limit)--> IterationLimitReached
//! ```
//!
//! Every verification pass is recorded in the state store. A failed remote
//! mutation during Correct is logged and left for the next Verify to pick
//! up; listing failures abort the cycle.

use crate::error::{Error, Result};
use crate::models::{
    entry::entries_from_listing, AddCorrection, CollectionRole, CollectionTarget, CorrectionSet,
    Entry, MoveCorrection, Provenance, RemoveCorrection,
};
use crate::sequencer::{run_sequencer, SequenceReport};
use crate::OrganizerContext;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Verify,
    Correct,
    Converged,
    IterationLimitReached,
}

/// How a reconciliation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Converged,
    /// Corrections remained after the last allowed pass
    IterationLimitReached,
    /// Corrections were planned and logged but not applied
    DryRun,
}

/// Result of one verification pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub live: Vec<Entry>,
    pub corrections: CorrectionSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub collection_id: String,
    pub role: CollectionRole,
    pub outcome: ReconcileOutcome,
    /// Correct passes run
    pub iterations: usize,
    /// Correction count of the final verification
    pub remaining: usize,
    pub passes: Vec<SequenceReport>,
}

/// Compare a desired sequence with the live collection
///
/// Only the first live occurrence of an item counts; later ones are removed.
/// Position mismatches matter only for ordered collections, and surplus live
/// items are removed everywhere except backlog.
pub fn diff_against_live(desired: &[Entry], live: &[Entry], role: CollectionRole) -> CorrectionSet {
    let mut corrections = CorrectionSet::default();

    let mut occurrences: HashMap<&str, Vec<&Entry>> = HashMap::new();
    for entry in live {
        occurrences.entry(entry.item_id.as_str()).or_default().push(entry);
    }

    for (index, wanted) in desired.iter().enumerate() {
        let Some(found) = occurrences.get(wanted.item_id.as_str()) else {
            corrections.add.push(AddCorrection {
                item_id: wanted.item_id.clone(),
                title: wanted.title.clone(),
                position: index,
            });
            continue;
        };

        for extra in &found[1..] {
            corrections.remove.push(RemoveCorrection {
                item_id: extra.item_id.clone(),
                title: extra.title.clone(),
                entry_id: extra.source.entry_id.clone(),
                position: extra.source.position,
            });
        }

        let first = found[0];
        if role.tracks_order() && first.source.position != index {
            corrections.moves.push(MoveCorrection {
                item_id: wanted.item_id.clone(),
                title: wanted.title.clone(),
                entry_id: first.source.entry_id.clone(),
                desired_position: index,
                live_position: first.source.position,
            });
        }
    }

    if !role.is_backlog() {
        let wanted: HashSet<&str> = desired.iter().map(|e| e.item_id.as_str()).collect();
        for entry in live.iter().filter(|e| !wanted.contains(e.item_id.as_str())) {
            corrections.remove.push(RemoveCorrection {
                item_id: entry.item_id.clone(),
                title: entry.title.clone(),
                entry_id: entry.source.entry_id.clone(),
                position: entry.source.position,
            });
        }
    }

    corrections
}

/// Rewrite provenance of desired entries that are already live
///
/// Entries present in the destination point at their first live occurrence,
/// so the sequencer repositions them instead of importing a second copy.
pub fn ending_from_live(desired: &[Entry], live: &[Entry]) -> Vec<Entry> {
    let mut first_live: HashMap<&str, &Provenance> = HashMap::new();
    for entry in live {
        first_live.entry(entry.item_id.as_str()).or_insert(&entry.source);
    }

    desired
        .iter()
        .map(|wanted| match first_live.get(wanted.item_id.as_str()) {
            Some(live_source) => Entry {
                item_id: wanted.item_id.clone(),
                title: wanted.title.clone(),
                source: (*live_source).clone(),
            },
            None => wanted.clone(),
        })
        .collect()
}

/// Fetch the live entries of the target collection
pub async fn fetch_live(ctx: &OrganizerContext, target: &CollectionTarget) -> Result<Vec<Entry>> {
    let listing = ctx
        .accessor
        .list(&target.collection_id)
        .await
        .map_err(|source| Error::SourceFetch {
            collection_id: target.collection_id.clone(),
            source,
        })?;
    Ok(entries_from_listing(listing, &target.collection_name))
}

pub async fn verify(ctx: &OrganizerContext, target: &CollectionTarget) -> Result<Verification> {
    let live = fetch_live(ctx, target).await?;
    let corrections = diff_against_live(&target.entries, &live, target.role);

    info!(
        collection_id = %target.collection_id,
        role = %target.role,
        add = corrections.add.len(),
        remove = corrections.remove.len(),
        moves = corrections.moves.len(),
        "Verified collection"
    );

    Ok(Verification { live, corrections })
}

pub async fn correct(
    ctx: &OrganizerContext,
    target: &CollectionTarget,
    verification: &Verification,
) -> Result<SequenceReport> {
    let ending = ending_from_live(&target.entries, &verification.live);
    run_sequencer(
        ctx,
        verification.live.clone(),
        ending,
        &target.collection_id,
        target.role,
    )
    .await
}

/// Alternate Verify and Correct until converged or out of iterations
pub async fn reconcile(ctx: &OrganizerContext, target: &CollectionTarget) -> Result<ReconcileReport> {
    let max_iterations = ctx.settings.max_iterations;
    let mut state = ReconcileState::Verify;
    let mut iterations = 0;
    let mut last: Option<Verification> = None;
    let mut passes = Vec::new();

    loop {
        match state {
            ReconcileState::Verify => {
                let verification = verify(ctx, target).await?;
                ctx.store
                    .record_corrections(&target.collection_id, iterations, &verification.corrections)
                    .await?;

                state = if verification.corrections.is_empty() {
                    ReconcileState::Converged
                } else if iterations >= max_iterations || (ctx.dry_run() && iterations > 0) {
                    ReconcileState::IterationLimitReached
                } else {
                    ReconcileState::Correct
                };
                last = Some(verification);
            }
            ReconcileState::Correct => {
                iterations += 1;
                if let Some(verification) = last.as_ref() {
                    match correct(ctx, target, verification).await {
                        Ok(report) => passes.push(report),
                        Err(e @ Error::RemoteMutation { .. }) => {
                            warn!(
                                collection_id = %target.collection_id,
                                iteration = iterations,
                                error = %e,
                                "Correction pass failed, re-verifying"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                if !ctx.dry_run() && !ctx.settings.verify_wait.is_zero() {
                    tokio::time::sleep(ctx.settings.verify_wait).await;
                }
                state = ReconcileState::Verify;
            }
            ReconcileState::Converged | ReconcileState::IterationLimitReached => break,
        }
    }

    let remaining = last.map(|v| v.corrections.total()).unwrap_or(0);
    let outcome = match state {
        ReconcileState::Converged => ReconcileOutcome::Converged,
        _ if ctx.dry_run() => ReconcileOutcome::DryRun,
        _ => ReconcileOutcome::IterationLimitReached,
    };

    if outcome == ReconcileOutcome::IterationLimitReached {
        warn!(
            collection_id = %target.collection_id,
            iterations,
            remaining,
            "Collection did not converge"
        );
    } else {
        info!(
            collection_id = %target.collection_id,
            iterations,
            remaining,
            outcome = ?outcome,
            "Reconciliation finished"
        );
    }

    Ok(ReconcileReport {
        collection_id: target.collection_id.clone(),
        role: target.role,
        outcome,
        iterations,
        remaining,
        passes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(item: &str, collection: &str, position: usize) -> Entry {
        Entry {
            item_id: item.to_string(),
            title: item.to_uppercase(),
            source: Provenance {
                collection_id: collection.to_string(),
                collection_name: collection.to_string(),
                position,
                entry_id: format!("{collection}:{item}:{position}"),
            },
        }
    }

    fn seq(collection: &str, items: &[&str]) -> Vec<Entry> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| entry(item, collection, i))
            .collect()
    }

    #[test]
    fn test_matching_state_has_no_corrections() {
        let desired = seq("DEST", &["a", "b", "c"]);
        let live = seq("DEST", &["a", "b", "c"]);
        for role in [CollectionRole::Primary, CollectionRole::Queue, CollectionRole::Backlog] {
            assert!(diff_against_live(&desired, &live, role).is_empty());
        }
    }

    #[test]
    fn test_swapped_and_missing() {
        let desired = seq("DEST", &["a", "b", "c"]);
        let live = seq("DEST", &["b", "a"]);

        let corrections = diff_against_live(&desired, &live, CollectionRole::Primary);

        assert_eq!(corrections.add.len(), 1);
        assert_eq!(corrections.add[0].item_id, "c");
        assert_eq!(corrections.add[0].position, 2);
        assert_eq!(corrections.moves.len(), 2);
        assert!(corrections.remove.is_empty());
        assert_eq!(corrections.total(), 3);
    }

    #[test]
    fn test_extra_live_occurrences_removed() {
        let desired = seq("DEST", &["a", "b"]);
        let live = seq("DEST", &["a", "b", "a"]);

        let corrections = diff_against_live(&desired, &live, CollectionRole::Backlog);
        assert_eq!(corrections.remove.len(), 1);
        assert_eq!(corrections.remove[0].position, 2);
    }

    #[test]
    fn test_unordered_roles_ignore_moves() {
        let desired = seq("DEST", &["a", "b"]);
        let live = seq("DEST", &["b", "a"]);
        for role in [CollectionRole::Queue, CollectionRole::Backlog] {
            assert!(diff_against_live(&desired, &live, role).moves.is_empty());
        }
    }

    #[test]
    fn test_backlog_keeps_surplus() {
        let desired = seq("DEST", &["a"]);
        let live = seq("DEST", &["a", "z", "y"]);

        assert!(diff_against_live(&desired, &live, CollectionRole::Backlog)
            .remove
            .is_empty());
        assert_eq!(
            diff_against_live(&desired, &live, CollectionRole::Queue)
                .remove
                .len(),
            2
        );
    }

    #[test]
    fn test_add_and_remove_disjoint() {
        let desired = seq("SRC", &["a", "b", "c"]);
        let live = seq("DEST", &["c", "c", "x"]);
        let corrections = diff_against_live(&desired, &live, CollectionRole::Primary);

        let added: HashSet<&str> = corrections.add.iter().map(|c| c.item_id.as_str()).collect();
        let removed: HashSet<&str> = corrections
            .remove
            .iter()
            .map(|c| c.item_id.as_str())
            .collect();
        assert!(added.is_disjoint(&removed));
        assert_eq!(added, HashSet::from(["a", "b"]));
        assert_eq!(removed, HashSet::from(["c", "x"]));
    }

    #[test]
    fn test_ending_points_at_live_entries() {
        let desired = vec![entry("a", "QUEUE", 4), entry("b", "BACKLOG", 0)];
        let live = seq("DEST", &["x", "a", "a"]);

        let ending = ending_from_live(&desired, &live);
        assert_eq!(ending[0].source, live[1].source);
        assert_eq!(ending[1].source.collection_id, "BACKLOG");
    }
}
