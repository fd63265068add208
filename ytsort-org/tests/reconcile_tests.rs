//! Verify/correct loop against the in-memory remote

mod helpers;

use helpers::{harness, item, live_entries, seed, settings, target};
use ytsort_org::cache::RecordCache;
use ytsort_org::controller::{reconcile, verify, ReconcileOutcome};
use ytsort_org::models::CollectionRole;
use ytsort_org::sequencer::run_sequencer;
use ytsort_org::Error;

#[tokio::test]
async fn test_swapped_and_missing_converges_in_one_pass() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["b", "a"]);
    seed(&h.remote, "OTHER", &["c"]);

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("b", "DEST"), ("c", "OTHER")],
    )
    .await;

    let first = verify(&h.ctx, &desired).await.unwrap();
    assert_eq!(first.corrections.add.len(), 1);
    assert_eq!(first.corrections.add[0].item_id, "c");

    let report = reconcile(&h.ctx, &desired).await.unwrap();

    assert_eq!(report.outcome, ReconcileOutcome::Converged);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(h.remote.item_ids("DEST"), vec!["a", "b", "c"]);

    let pass = &report.passes[0];
    assert_eq!(pass.updated, 1);
    assert_eq!(pass.imported, 1);
    assert_eq!(pass.removed, 0);

    let history = h.store.correction_history("DEST").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].corrections.total(), 3);
    assert!(history[1].corrections.is_empty());
}

#[tokio::test]
async fn test_matching_state_converges_without_mutations() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["a", "b", "c"]);

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("b", "DEST"), ("c", "DEST")],
    )
    .await;

    let verification = verify(&h.ctx, &desired).await.unwrap();
    assert!(verification.corrections.add.is_empty());
    assert!(verification.corrections.remove.is_empty());
    assert!(verification.corrections.moves.is_empty());

    let report = reconcile(&h.ctx, &desired).await.unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::Converged);
    assert_eq!(report.iterations, 0);
    assert_eq!(h.remote.mutation_count(), 0);
}

#[tokio::test]
async fn test_backlog_keeps_items_missing_from_desired() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "BACKLOG", &["z", "a", "y"]);
    seed(&h.remote, "OTHER", &["n"]);

    let desired = target(
        &h.remote,
        "BACKLOG",
        CollectionRole::Backlog,
        &[("a", "BACKLOG"), ("n", "OTHER")],
    )
    .await;

    let report = reconcile(&h.ctx, &desired).await.unwrap();

    assert_eq!(report.outcome, ReconcileOutcome::Converged);
    assert_eq!(h.remote.item_ids("BACKLOG"), vec!["n", "z", "a", "y"]);
}

#[tokio::test]
async fn test_queue_imports_at_head() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "QUEUE", &["q1", "q2"]);
    seed(&h.remote, "OTHER", &["x1", "x2"]);

    let desired = target(
        &h.remote,
        "QUEUE",
        CollectionRole::Queue,
        &[("q1", "QUEUE"), ("q2", "QUEUE"), ("x1", "OTHER"), ("x2", "OTHER")],
    )
    .await;

    let report = reconcile(&h.ctx, &desired).await.unwrap();

    assert_eq!(report.outcome, ReconcileOutcome::Converged);
    assert_eq!(h.remote.item_ids("QUEUE"), vec!["x2", "x1", "q1", "q2"]);
}

#[tokio::test]
async fn test_live_duplicates_removed() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["a", "b", "a", "b"]);

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("b", "DEST")],
    )
    .await;

    let first = verify(&h.ctx, &desired).await.unwrap();
    assert_eq!(first.corrections.remove.len(), 2);

    let report = reconcile(&h.ctx, &desired).await.unwrap();
    assert_eq!(report.outcome, ReconcileOutcome::Converged);
    assert_eq!(report.passes[0].duplicates_removed, 2);
    assert_eq!(h.remote.item_ids("DEST"), vec!["a", "b"]);
}

#[tokio::test]
async fn test_failed_mutation_reported_after_iteration_limit() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["b", "a"]);
    seed(&h.remote, "OTHER", &["c"]);
    h.remote.fail_mutations_for("c");

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("b", "DEST"), ("c", "OTHER")],
    )
    .await;

    let report = reconcile(&h.ctx, &desired).await.unwrap();

    assert_eq!(report.outcome, ReconcileOutcome::IterationLimitReached);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.remaining, 1);
    // Earlier operations in the failed run stay applied
    assert_eq!(h.remote.item_ids("DEST"), vec!["a", "b"]);
}

#[tokio::test]
async fn test_listing_failure_aborts() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["a"]);
    let desired = target(&h.remote, "DEST", CollectionRole::Primary, &[("a", "DEST")]).await;

    h.remote.fail_listing("DEST");
    let result = reconcile(&h.ctx, &desired).await;

    assert!(matches!(result, Err(Error::SourceFetch { .. })));
}

#[tokio::test]
async fn test_dry_run_leaves_remote_untouched() {
    let mut dry = settings(10, 5, 2);
    dry.dry_run = true;
    let h = harness(dry).await;
    seed(&h.remote, "DEST", &["b", "a", "z"]);
    seed(&h.remote, "OTHER", &["c"]);

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("b", "DEST"), ("c", "OTHER")],
    )
    .await;

    let report = reconcile(&h.ctx, &desired).await.unwrap();

    assert_eq!(report.outcome, ReconcileOutcome::DryRun);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.passes[0].operations(), 3);
    assert_eq!(h.remote.mutation_count(), 0);
    assert_eq!(h.remote.item_ids("DEST"), vec!["b", "a", "z"]);
}

#[tokio::test]
async fn test_second_sequencer_run_is_noop() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["d", "b", "a", "q"]);
    seed(&h.remote, "OTHER", &["k", "m"]);

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("k", "OTHER"), ("b", "DEST"), ("d", "DEST"), ("m", "OTHER")],
    )
    .await;

    let start = live_entries(&h.remote, "DEST").await;
    let first = run_sequencer(&h.ctx, start, desired.entries.clone(), "DEST", CollectionRole::Primary)
        .await
        .unwrap();
    assert!(first.operations() > 0);
    assert_eq!(h.remote.item_ids("DEST"), vec!["a", "k", "b", "d", "m"]);

    let mutations = h.remote.mutation_count();
    let live = live_entries(&h.remote, "DEST").await;
    let second = run_sequencer(&h.ctx, live.clone(), live, "DEST", CollectionRole::Primary)
        .await
        .unwrap();

    assert_eq!(second.operations(), 0);
    assert_eq!(h.remote.mutation_count(), mutations);
}

#[tokio::test]
async fn test_membership_written_through() {
    let h = harness(settings(10, 5, 2)).await;
    seed(&h.remote, "DEST", &["a", "gone"]);
    seed(&h.remote, "OTHER", &["c"]);
    h.remote.put_item(item("c", "UC1", 3));

    let desired = target(
        &h.remote,
        "DEST",
        CollectionRole::Primary,
        &[("a", "DEST"), ("c", "OTHER")],
    )
    .await;
    reconcile(&h.ctx, &desired).await.unwrap();

    assert!(h.cache.has_membership("c", "DEST").await.unwrap());
    assert!(!h.cache.has_membership("gone", "DEST").await.unwrap());
    let record = h.cache.membership_record("c").await.unwrap().unwrap();
    assert_eq!(record.memberships["DEST"].position, 1);
}
