//! Persisted desired state and correction history
//!
//! Desired targets are written after every build and read back by the
//! verify phase, so a verification can run in a later process than the
//! build that produced its target. Correction history is bounded per
//! collection.

use crate::error::{Error, Result};
use crate::models::{CollectionTarget, CorrectionSet, DesiredState, Entry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;
use ytsort_common::db::{CorrectionSetRow, DesiredStateRow};
use ytsort_common::time::{now, parse_timestamp};

/// One verification pass as recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPass {
    pub pass_id: Uuid,
    pub collection_id: String,
    pub iteration: usize,
    pub corrections: CorrectionSet,
    pub recorded_at: DateTime<Utc>,
}

const DEFAULT_HISTORY_PER_COLLECTION: usize = 100;

/// Reads and writes the `desired_state` and `correction_sets` tables
#[derive(Clone)]
pub struct StateStore {
    db: SqlitePool,
    history_per_collection: usize,
}

impl StateStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            history_per_collection: DEFAULT_HISTORY_PER_COLLECTION,
        }
    }

    /// Keep at most `limit` correction passes per collection (minimum 1)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_per_collection = limit.max(1);
        self
    }

    /// Write all three targets of a category atomically
    pub async fn save_desired_state(&self, state: &DesiredState) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for target in state.targets() {
            write_target(&mut *tx, target).await?;
        }
        tx.commit().await?;

        debug!(category = %state.category, "Saved desired state");
        Ok(())
    }

    pub async fn save_target(&self, target: &CollectionTarget) -> Result<()> {
        write_target(&self.db, target).await
    }

    pub async fn load_target(&self, collection_id: &str) -> Result<Option<CollectionTarget>> {
        let row: Option<DesiredStateRow> =
            sqlx::query_as("SELECT * FROM desired_state WHERE collection_id = ?")
                .bind(collection_id)
                .fetch_optional(&self.db)
                .await?;

        row.map(target_from_row).transpose()
    }

    /// Targets of a category in reconciliation order (primary, queue, backlog)
    pub async fn load_category(&self, category: &str) -> Result<Vec<CollectionTarget>> {
        let rows: Vec<DesiredStateRow> = sqlx::query_as(
            r#"
            SELECT * FROM desired_state WHERE category = ?
            ORDER BY CASE role WHEN 'primary' THEN 0 WHEN 'queue' THEN 1 ELSE 2 END
            "#,
        )
        .bind(category)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(target_from_row).collect()
    }

    pub async fn record_corrections(
        &self,
        collection_id: &str,
        iteration: usize,
        corrections: &CorrectionSet,
    ) -> Result<CorrectionPass> {
        let pass = CorrectionPass {
            pass_id: Uuid::new_v4(),
            collection_id: collection_id.to_string(),
            iteration,
            corrections: corrections.clone(),
            recorded_at: now(),
        };

        sqlx::query(
            r#"
            INSERT INTO correction_sets (pass_id, collection_id, iteration, corrections, total, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(pass.pass_id.to_string())
        .bind(&pass.collection_id)
        .bind(iteration as i64)
        .bind(serde_json::to_string(corrections)?)
        .bind(corrections.total() as i64)
        .bind(pass.recorded_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        self.prune_history(collection_id).await?;
        Ok(pass)
    }

    /// Drop all but the newest passes of a collection; returns rows removed
    pub async fn prune_history(&self, collection_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM correction_sets
            WHERE collection_id = ? AND rowid NOT IN (
                SELECT rowid FROM correction_sets
                WHERE collection_id = ?
                ORDER BY rowid DESC LIMIT ?
            )
            "#,
        )
        .bind(collection_id)
        .bind(collection_id)
        .bind(self.history_per_collection as i64)
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            debug!(
                collection_id = %collection_id,
                pruned = result.rows_affected(),
                "Pruned correction history"
            );
        }
        Ok(result.rows_affected())
    }

    /// Recorded passes for a collection, oldest first
    pub async fn correction_history(&self, collection_id: &str) -> Result<Vec<CorrectionPass>> {
        let rows: Vec<CorrectionSetRow> = sqlx::query_as(
            "SELECT * FROM correction_sets WHERE collection_id = ? ORDER BY recorded_at, iteration",
        )
        .bind(collection_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<CorrectionPass> {
                Ok(CorrectionPass {
                    pass_id: Uuid::parse_str(&row.pass_id)
                        .map_err(|e| Error::Config(format!("Bad pass id {}: {}", row.pass_id, e)))?,
                    corrections: serde_json::from_str(&row.corrections)?,
                    recorded_at: parse_timestamp(&row.recorded_at)?,
                    iteration: row.iteration.max(0) as usize,
                    collection_id: row.collection_id,
                })
            })
            .collect()
    }
}

/// Upsert one target through a pool or an open transaction
async fn write_target<'e, E>(executor: E, target: &CollectionTarget) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let entries = serde_json::to_string(&target.entries)?;

    sqlx::query(
        r#"
        INSERT INTO desired_state (collection_id, category, role, collection_name, entries, written_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(collection_id) DO UPDATE SET
            category = excluded.category,
            role = excluded.role,
            collection_name = excluded.collection_name,
            entries = excluded.entries,
            written_at = excluded.written_at
        "#,
    )
    .bind(&target.collection_id)
    .bind(&target.category)
    .bind(target.role.as_str())
    .bind(&target.collection_name)
    .bind(entries)
    .bind(now().to_rfc3339())
    .execute(executor)
    .await?;

    debug!(
        collection_id = %target.collection_id,
        role = %target.role,
        entries = target.len(),
        "Saved desired target"
    );
    Ok(())
}

fn target_from_row(row: DesiredStateRow) -> Result<CollectionTarget> {
    let entries: Vec<Entry> = serde_json::from_str(&row.entries)?;
    let role = row
        .role
        .parse()
        .map_err(|e: String| Error::Config(format!("desired_state {}: {}", row.collection_id, e)))?;

    Ok(CollectionTarget {
        category: row.category,
        role,
        collection_id: row.collection_id,
        collection_name: row.collection_name,
        entries,
    })
}
