use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserGoalRow {
    pub user_id: Uuid,
    pub career_goal: Option<String>,
    pub education_level: Option<String>,
    pub current_study: Option<String>,
    pub study_year: Option<String>,
    pub top_priority: Option<String>,
    /// Free-text list of courses the student is currently taking.
    pub courses: Option<String>,
    pub is_public: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserGoalRow {
    /// The stated career goal, if it is set and not blank.
    pub fn career_goal(&self) -> Option<&str> {
        self.career_goal
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

/// Onboarding / settings payload. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalInput {
    pub career_goal: Option<String>,
    pub education_level: Option<String>,
    pub current_study: Option<String>,
    pub study_year: Option<String>,
    pub top_priority: Option<String>,
    pub courses: Option<String>,
}
