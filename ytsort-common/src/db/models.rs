//! Database row models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemRow {
    pub item_id: String,
    pub title: String,
    pub source_id: String,
    pub source_title: String,
    pub duration_secs: i64,
    pub published_at: String,
    pub private: bool,
    pub current_collection: Option<String>,
    pub date_cached: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipRow {
    pub item_id: String,
    pub collection_id: String,
    pub entry_id: String,
    pub position: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DesiredStateRow {
    pub collection_id: String,
    pub category: String,
    pub role: String,
    pub collection_name: String,
    pub entries: String,
    pub written_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CorrectionSetRow {
    pub pass_id: String,
    pub collection_id: String,
    pub iteration: i64,
    pub corrections: String,
    pub total: i64,
    pub recorded_at: String,
}
