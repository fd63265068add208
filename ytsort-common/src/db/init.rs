//! Database initialization
//!
//! Creates the SQLite database on first run and applies the schema idempotently.
//! Every table is created with `CREATE TABLE IF NOT EXISTS`, so opening an
//! existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // The record cache is single-writer; a small pool is plenty
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets concurrent detail lookups read while the apply phase writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection: every pooled connection to `sqlite::memory:`
/// would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Apply the full schema
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_items_table(pool).await?;
    create_memberships_table(pool).await?;
    create_desired_state_table(pool).await?;
    create_correction_sets_table(pool).await?;
    Ok(())
}

/// Item metadata, cached indefinitely after the first remote lookup
async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            source_id TEXT NOT NULL,
            source_title TEXT NOT NULL DEFAULT '',
            duration_secs INTEGER NOT NULL DEFAULT 0,
            published_at TEXT NOT NULL,
            private INTEGER NOT NULL DEFAULT 0,
            current_collection TEXT,
            date_cached TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Membership facts: at most one row per (item, collection) pair
async fn create_memberships_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS memberships (
            item_id TEXT NOT NULL,
            collection_id TEXT NOT NULL,
            entry_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (item_id, collection_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_memberships_collection ON memberships(collection_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Desired ordering per managed collection (JSON-encoded entries)
async fn create_desired_state_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS desired_state (
            collection_id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            role TEXT NOT NULL,
            collection_name TEXT NOT NULL DEFAULT '',
            entries TEXT NOT NULL,
            written_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per verification pass
async fn create_correction_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correction_sets (
            pass_id TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL,
            iteration INTEGER NOT NULL,
            corrections TEXT NOT NULL,
            total INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_correction_sets_collection ON correction_sets(collection_id, recorded_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
