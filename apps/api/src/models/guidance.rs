use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CareerGuidanceRow {
    pub user_id: Uuid,
    pub career_goal: String,
    pub readiness_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    /// JSON array of `GuidanceGap`.
    pub gaps: Value,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceGap {
    pub skill: String,
    /// One of `high`, `medium`, `low`.
    pub importance: String,
    pub suggestion: String,
}

/// Replacement guidance for a user; always written as a full upsert.
#[derive(Debug, Clone)]
pub struct NewGuidance {
    pub user_id: Uuid,
    pub career_goal: String,
    pub readiness_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<GuidanceGap>,
    pub recommendations: Vec<String>,
}
