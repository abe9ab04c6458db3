use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SkillSnapshotRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    /// `{"technical": n, "soft": n, "transferable": n}`
    pub counts_by_type: Value,
    pub total_count: i32,
    pub top_categories: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub counts_by_type: Value,
    pub total_count: i32,
    pub top_categories: Vec<String>,
}
