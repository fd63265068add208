//! SQLite-backed record cache

use super::RecordCache;
use crate::error::Result;
use crate::models::{Item, ItemId, Membership, MembershipRecord};
use crate::remote::{fetch_details, DetailFetchPlan, ItemDetails};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use ytsort_common::db::{ItemRow, MembershipRow};
use ytsort_common::time::{now, parse_timestamp};

/// Record cache persisted in the `items` and `memberships` tables
pub struct SqliteRecordCache {
    db: SqlitePool,
    details: Arc<dyn ItemDetails>,
    plan: DetailFetchPlan,
}

impl SqliteRecordCache {
    pub fn new(db: SqlitePool, details: Arc<dyn ItemDetails>, plan: DetailFetchPlan) -> Self {
        Self { db, details, plan }
    }

    async fn cached_item(&self, item_id: &str) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as("SELECT * FROM items WHERE item_id = ?")
            .bind(item_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(item_from_row).transpose()
    }

    async fn store_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (item_id, title, source_id, source_title, duration_secs,
                               published_at, private, date_cached)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                title = excluded.title,
                source_id = excluded.source_id,
                source_title = excluded.source_title,
                duration_secs = excluded.duration_secs,
                published_at = excluded.published_at,
                private = excluded.private,
                date_cached = excluded.date_cached
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.source_id)
        .bind(&item.source_title)
        .bind(item.duration_secs as i64)
        .bind(item.published_at.to_rfc3339())
        .bind(item.private)
        .bind(now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Fetch `missing` from the remote and cache the answers
    ///
    /// Ids the remote does not return are cached as unavailable placeholders;
    /// the next lookup that allows a remote fetch asks for them again.
    async fn fetch_and_store(&self, missing: &[ItemId]) -> Result<Vec<Item>> {
        let fetched = fetch_details(self.details.as_ref(), missing, &self.plan).await?;
        let mut by_id: HashMap<ItemId, Item> =
            fetched.into_iter().map(|i| (i.id.clone(), i)).collect();

        let mut stored = Vec::with_capacity(missing.len());
        for id in missing {
            let item = by_id.remove(id).unwrap_or_else(|| Item::unavailable(id.clone()));
            self.store_item(&item).await?;
            stored.push(item);
        }

        info!(
            requested = missing.len(),
            unavailable = stored.iter().filter(|i| i.private).count(),
            "Cached item details from remote"
        );
        Ok(stored)
    }

    async fn refresh_current_collection(&self, item_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE items SET current_collection = (
                SELECT collection_id FROM memberships
                WHERE memberships.item_id = items.item_id
                ORDER BY updated_at DESC LIMIT 1
            )
            WHERE item_id = ?
            "#,
        )
        .bind(item_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

fn item_from_row(row: ItemRow) -> Result<Item> {
    Ok(Item {
        published_at: parse_timestamp(&row.published_at)?,
        id: row.item_id,
        title: row.title,
        source_id: row.source_id,
        source_title: row.source_title,
        duration_secs: row.duration_secs.max(0) as u64,
        private: row.private,
    })
}

#[async_trait]
impl RecordCache for SqliteRecordCache {
    async fn lookup(&self, item_id: &str, allow_remote_fetch: bool) -> Result<Option<Item>> {
        match self.cached_item(item_id).await? {
            Some(item) if !item.private || !allow_remote_fetch => return Ok(Some(item)),
            Some(_) => debug!(item_id = %item_id, "Rechecking unavailable item"),
            None if !allow_remote_fetch => return Ok(None),
            None => {}
        }

        let mut fetched = self.fetch_and_store(&[item_id.to_string()]).await?;
        Ok(fetched.pop())
    }

    async fn lookup_many(
        &self,
        item_ids: &[ItemId],
        allow_remote_fetch: bool,
    ) -> Result<HashMap<ItemId, Item>> {
        let mut found = HashMap::with_capacity(item_ids.len());
        let mut missing = Vec::new();
        let mut rechecked = 0;

        for id in item_ids {
            if found.contains_key(id) || missing.contains(id) {
                continue;
            }
            match self.cached_item(id).await? {
                Some(item) if item.private && allow_remote_fetch => {
                    rechecked += 1;
                    missing.push(id.clone());
                }
                Some(item) => {
                    found.insert(id.clone(), item);
                }
                None => missing.push(id.clone()),
            }
        }

        debug!(
            cached = found.len(),
            missing = missing.len(),
            rechecked,
            "Item lookup"
        );

        if allow_remote_fetch && !missing.is_empty() {
            for item in self.fetch_and_store(&missing).await? {
                found.insert(item.id.clone(), item);
            }
        }

        Ok(found)
    }

    async fn set_membership(
        &self,
        item_id: &str,
        collection_id: &str,
        membership: Membership,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memberships (item_id, collection_id, entry_id, position, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(item_id, collection_id) DO UPDATE SET
                entry_id = excluded.entry_id,
                position = excluded.position,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item_id)
        .bind(collection_id)
        .bind(&membership.entry_id)
        .bind(membership.position as i64)
        .bind(now().to_rfc3339())
        .execute(&self.db)
        .await?;

        sqlx::query("UPDATE items SET current_collection = ? WHERE item_id = ?")
            .bind(collection_id)
            .bind(item_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn clear_membership(&self, item_id: &str, collection_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM memberships WHERE item_id = ? AND collection_id = ?")
            .bind(item_id)
            .bind(collection_id)
            .execute(&self.db)
            .await?;

        self.refresh_current_collection(item_id).await
    }

    async fn has_membership(&self, item_id: &str, collection_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM memberships WHERE item_id = ? AND collection_id = ?",
        )
        .bind(item_id)
        .bind(collection_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    async fn membership_record(&self, item_id: &str) -> Result<Option<MembershipRecord>> {
        let rows: Vec<MembershipRow> =
            sqlx::query_as("SELECT * FROM memberships WHERE item_id = ?")
                .bind(item_id)
                .fetch_all(&self.db)
                .await?;

        let current: Option<(Option<String>, String)> = sqlx::query_as(
            "SELECT current_collection, date_cached FROM items WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        if rows.is_empty() && current.is_none() {
            return Ok(None);
        }

        let mut last_synced = None;
        let mut memberships = BTreeMap::new();
        for row in rows {
            let updated = parse_timestamp(&row.updated_at)?;
            if last_synced.map_or(true, |t| updated > t) {
                last_synced = Some(updated);
            }
            memberships.insert(
                row.collection_id,
                Membership {
                    entry_id: row.entry_id,
                    position: row.position.max(0) as usize,
                },
            );
        }

        Ok(Some(MembershipRecord {
            item_id: item_id.to_string(),
            memberships,
            current_collection: current.and_then(|(c, _)| c),
            last_synced,
        }))
    }

    async fn collection_members(&self, collection_id: &str) -> Result<Vec<ItemId>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT item_id FROM memberships WHERE collection_id = ? ORDER BY position",
        )
        .bind(collection_id)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }
}
