//! ytsort-org - Main entry point
//!
//! Organizes each category's primary, queue and backlog collections and
//! reconciles them with the remote.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytsort_common::config::{ensure_root_folder, load_toml_config, resolve_root_folder, TomlConfig};
use ytsort_common::db::init_database;
use ytsort_org::cache::SqliteRecordCache;
use ytsort_org::models::CollectionRole;
use ytsort_org::organizer::{
    fetch_source, organize_category, remove_shorts, summarize_collection, verify_category,
};
use ytsort_org::ranks::TierRanking;
use ytsort_org::remote::{DetailFetchPlan, YouTubeClient};
use ytsort_org::store::StateStore;
use ytsort_org::sync::sync_collection;
use ytsort_org::{OrganizerContext, OrganizerSettings};

/// Command-line arguments for ytsort-org
#[derive(Parser, Debug)]
#[command(name = "ytsort-org")]
#[command(about = "Ranks, caps and reconciles remote playlists")]
#[command(version)]
struct Args {
    /// Root folder holding the database and ranks file
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log intended remote changes without applying them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and reconcile categories (all categories when none are named)
    Organize { categories: Vec<String> },
    /// Compare live collections with the last recorded desired state
    Verify { category: String },
    /// Refresh cached memberships from live collections
    Sync { collections: Vec<String> },
    /// Count a category's items per source
    List { category: String },
    /// Remove invalid items from a category's queue
    RemoveShorts { category: String },
}

fn init_tracing(config: &TomlConfig) {
    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("ytsort_org={level},ytsort_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = ensure_root_folder(&root_folder).context("Failed to prepare root folder")?;
    info!("Root folder: {}", root_folder.display());

    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let token = config
        .api
        .resolve_access_token()
        .context("No API access token configured")?;
    let client = Arc::new(YouTubeClient::new(&config.api, token)?);

    let cache = Arc::new(SqliteRecordCache::new(
        db.clone(),
        client.clone(),
        DetailFetchPlan::from_config(&config.api),
    ));
    let ctx = OrganizerContext::new(
        client,
        cache,
        StateStore::new(db).with_history_limit(config.organizer.history_per_collection),
        OrganizerSettings::from_config(&config.organizer, args.dry_run),
    );

    if args.dry_run {
        info!("Dry run: remote collections will not be modified");
    }

    let ranks_path = config.ranks_path(&root_folder);
    let load_ranks = || {
        TierRanking::load(&ranks_path)
            .with_context(|| format!("Failed to load ranks file {}", ranks_path.display()))
    };

    match args.command {
        Command::Organize { categories } => {
            let ranking = load_ranks()?;
            let categories = if categories.is_empty() {
                ranking.category_names().map(str::to_string).collect()
            } else {
                categories
            };

            for category in categories {
                let report = organize_category(&ctx, &ranking, &category)
                    .await
                    .with_context(|| format!("Failed to organize category {}", category))?;

                println!(
                    "{}: primary {}, backlog {}, queue {} ({} invalid, {} duplicates, {} backlog copies removed)",
                    report.category,
                    report.primary_len,
                    report.backlog_len,
                    report.queue_len,
                    report.shorts_removed,
                    report.duplicates_removed,
                    report.backlog_cleaned,
                );
                for collection in &report.reconciled {
                    println!(
                        "  {} {}: {:?} after {} pass(es), {} correction(s) remaining",
                        collection.role,
                        collection.collection_id,
                        collection.outcome,
                        collection.iterations,
                        collection.remaining,
                    );
                }
            }
        }
        Command::Verify { category } => {
            for (target, verification) in verify_category(&ctx, &category).await? {
                let corrections = &verification.corrections;
                println!(
                    "{} {} ({}): {} to add, {} to remove, {} to move",
                    target.role,
                    target.collection_id,
                    target.collection_name,
                    corrections.add.len(),
                    corrections.remove.len(),
                    corrections.moves.len(),
                );
                for add in &corrections.add {
                    println!("  + [{}] {}", add.position, add.title);
                }
                for remove in &corrections.remove {
                    println!("  - [{}] {}", remove.position, remove.title);
                }
                for moved in &corrections.moves {
                    println!(
                        "  ~ [{} -> {}] {}",
                        moved.live_position, moved.desired_position, moved.title
                    );
                }
            }
        }
        Command::Sync { collections } => {
            for collection_id in collections {
                let report = sync_collection(&ctx, &collection_id).await?;
                println!(
                    "{}: {} present, {} stale cleared, {} duplicate entries",
                    report.collection_id, report.present, report.cleared, report.duplicates
                );
            }
        }
        Command::List { category } => {
            let ranking = load_ranks()?;
            let spec = ranking.category(&category)?;
            for (role, collection_id) in [
                (CollectionRole::Primary, &spec.primary),
                (CollectionRole::Queue, &spec.queue),
                (CollectionRole::Backlog, &spec.backlog),
            ] {
                let summary = summarize_collection(&ctx, role, collection_id).await?;
                println!("{} ({}): {} items", summary.name, role, summary.total);
                for (source, count) in &summary.by_source {
                    println!("  {:>4}  {}", count, source);
                }
                if summary.unavailable > 0 {
                    println!("  {:>4}  (unavailable)", summary.unavailable);
                }
            }
        }
        Command::RemoveShorts { category } => {
            let ranking = load_ranks()?;
            let spec = ranking.category(&category)?;
            let queue = fetch_source(&ctx, CollectionRole::Queue, &spec.queue).await?;
            let (_, removed) = remove_shorts(&ctx, queue).await?;
            println!("{}: {} invalid item(s) removed from queue", category, removed);
        }
    }

    Ok(())
}
