//! Full category passes: build, persist, reconcile, clean backlog

mod helpers;

use helpers::{harness, item, seed, settings, Harness};
use ytsort_org::controller::ReconcileOutcome;
use ytsort_org::models::Item;
use ytsort_org::organizer::{organize_category, verify_category};
use ytsort_org::ranks::TierRanking;
use ytsort_org::Error;

const RANKS: &str = r#"
    [channels]
    "Alpha" = "UCa"
    "Beta" = "UCb"
    "Filler" = "UCf"

    [[tiers]]
    name = "music"
    channels = ["Alpha", "Beta"]

    [[tiers]]
    name = "filler"
    channels = ["Filler"]

    [categories.music]
    primary = "PLp"
    queue = "PLq"
    backlog = "PLb"
    filler_rank = "filler"
"#;

fn short(id: &str, source: &str) -> Item {
    Item {
        duration_secs: 30,
        ..item(id, source, 1)
    }
}

fn register(h: &Harness, items: Vec<Item>) {
    for item in items {
        h.remote.put_item(item);
    }
}

/// Primary over capacity: overflow goes to backlog, queue empties
async fn overflowing_category(h: &Harness) {
    register(
        h,
        vec![
            item("a1", "UCa", 1),
            item("a2", "UCa", 3),
            item("b1", "UCb", 2),
            item("b2", "UCb", 4),
            item("x1", "UCx", 1),
            item("f1", "UCf", 1),
            item("f2", "UCf", 2),
            short("s1", "UCa"),
        ],
    );
    seed(&h.remote, "PLp", &["b1", "x1"]);
    seed(&h.remote, "PLq", &["a1", "s1", "a2", "b2", "a1"]);
    seed(&h.remote, "PLb", &["f1", "f2"]);
}

#[tokio::test]
async fn test_organize_overflowing_category() {
    let h = harness(settings(3, 2, 1)).await;
    overflowing_category(&h).await;
    let ranking = TierRanking::parse(RANKS).unwrap();

    let report = organize_category(&h.ctx, &ranking, "music").await.unwrap();

    assert_eq!(report.shorts_removed, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.primary_len, 3);
    assert_eq!(report.backlog_len, 3);
    assert_eq!(report.queue_len, 0);
    assert_eq!(report.backlog_cleaned, 0);
    assert!(report
        .reconciled
        .iter()
        .all(|r| r.outcome == ReconcileOutcome::Converged));

    assert_eq!(h.remote.item_ids("PLp"), vec!["a1", "a2", "b1"]);
    assert!(h.remote.item_ids("PLq").is_empty());
    assert_eq!(h.remote.item_ids("PLb"), vec!["b2", "f1", "f2"]);
}

#[tokio::test]
async fn test_organize_twice_is_stable() {
    let h = harness(settings(3, 2, 1)).await;
    overflowing_category(&h).await;
    let ranking = TierRanking::parse(RANKS).unwrap();

    organize_category(&h.ctx, &ranking, "music").await.unwrap();
    let mutations = h.remote.mutation_count();

    let report = organize_category(&h.ctx, &ranking, "music").await.unwrap();

    assert_eq!(h.remote.mutation_count(), mutations);
    assert!(report.reconciled.iter().all(|r| r.iterations == 0));
}

#[tokio::test]
async fn test_short_primary_takes_filler_and_backlog_is_cleaned() {
    let h = harness(settings(4, 2, 1)).await;
    register(
        &h,
        vec![
            item("a1", "UCa", 1),
            item("f1", "UCf", 1),
            item("f2", "UCf", 2),
            item("f3", "UCf", 3),
        ],
    );
    seed(&h.remote, "PLp", &[]);
    seed(&h.remote, "PLq", &["a1"]);
    seed(&h.remote, "PLb", &["f1", "f2", "f3"]);
    let ranking = TierRanking::parse(RANKS).unwrap();

    let report = organize_category(&h.ctx, &ranking, "music").await.unwrap();

    assert_eq!(h.remote.item_ids("PLp"), vec!["a1", "f1"]);
    assert!(h.remote.item_ids("PLq").is_empty());
    assert_eq!(report.backlog_cleaned, 1);
    assert_eq!(h.remote.item_ids("PLb"), vec!["f2", "f3"]);
}

#[tokio::test]
async fn test_fetch_failure_commits_nothing() {
    let h = harness(settings(3, 2, 1)).await;
    overflowing_category(&h).await;
    h.remote.fail_listing("PLb");
    let ranking = TierRanking::parse(RANKS).unwrap();

    let result = organize_category(&h.ctx, &ranking, "music").await;

    assert!(matches!(
        result,
        Err(Error::SourceFetch { ref collection_id, .. }) if collection_id == "PLb"
    ));
    assert_eq!(h.remote.mutation_count(), 0);
    assert!(h.store.load_category("music").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_category() {
    let h = harness(settings(3, 2, 1)).await;
    let ranking = TierRanking::parse(RANKS).unwrap();

    let result = organize_category(&h.ctx, &ranking, "podcasts").await;
    assert!(matches!(result, Err(Error::UnknownCategory(_))));
}

#[tokio::test]
async fn test_invalid_items_removed_from_every_collection() {
    let h = harness(settings(3, 2, 1)).await;
    register(
        &h,
        vec![
            item("a1", "UCa", 1),
            item("b1", "UCb", 2),
            short("s1", "UCa"),
            short("s2", "UCb"),
        ],
    );
    seed(&h.remote, "PLp", &["a1", "s2"]);
    seed(&h.remote, "PLq", &[]);
    seed(&h.remote, "PLb", &["s1", "b1"]);
    let ranking = TierRanking::parse(RANKS).unwrap();

    let report = organize_category(&h.ctx, &ranking, "music").await.unwrap();
    assert_eq!(report.shorts_removed, 2);
    assert_eq!(h.remote.item_ids("PLp"), vec!["a1", "b1"]);
    assert_eq!(h.remote.item_ids("PLb"), Vec::<String>::new());

    // Nothing invalid is left for a second pass to find
    let again = organize_category(&h.ctx, &ranking, "music").await.unwrap();
    assert_eq!(again.shorts_removed, 0);
    assert_eq!(h.remote.item_ids("PLb"), Vec::<String>::new());
}

#[tokio::test]
async fn test_dry_run_plans_without_mutating() {
    let mut dry = settings(3, 2, 1);
    dry.dry_run = true;
    let h = harness(dry).await;
    overflowing_category(&h).await;
    let ranking = TierRanking::parse(RANKS).unwrap();

    let report = organize_category(&h.ctx, &ranking, "music").await.unwrap();

    assert_eq!(h.remote.mutation_count(), 0);
    assert_eq!(h.remote.item_ids("PLp"), vec!["b1", "x1"]);
    assert_eq!(report.shorts_removed, 1);
    assert!(report
        .reconciled
        .iter()
        .all(|r| r.outcome == ReconcileOutcome::DryRun));
}

#[tokio::test]
async fn test_verify_after_organize_is_clean() {
    let h = harness(settings(3, 2, 1)).await;
    overflowing_category(&h).await;
    let ranking = TierRanking::parse(RANKS).unwrap();
    organize_category(&h.ctx, &ranking, "music").await.unwrap();

    let results = verify_category(&h.ctx, "music").await.unwrap();

    assert_eq!(results.len(), 3);
    for (target, verification) in results {
        assert!(
            verification.corrections.is_empty(),
            "{} not clean",
            target.collection_id
        );
    }
}

#[tokio::test]
async fn test_verify_without_desired_state() {
    let h = harness(settings(3, 2, 1)).await;
    let result = verify_category(&h.ctx, "music").await;
    assert!(matches!(result, Err(Error::Config(_))));
}
