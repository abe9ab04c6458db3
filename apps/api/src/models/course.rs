use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Planned,
    Enrolled,
    Completed,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Planned => "planned",
            CourseStatus::Enrolled => "enrolled",
            CourseStatus::Completed => "completed",
        }
    }
}

impl FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(CourseStatus::Planned),
            "enrolled" => Ok(CourseStatus::Enrolled),
            "completed" => Ok(CourseStatus::Completed),
            other => Err(format!(
                "Invalid course status '{other}' (expected planned, enrolled or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub provider: Option<String>,
    pub url: Option<String>,
    pub status: String,
    pub skill_tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated course ready for insertion.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub provider: Option<String>,
    pub url: Option<String>,
    pub status: CourseStatus,
    pub skill_tags: Vec<String>,
    pub notes: Option<String>,
}

/// A validated partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub url: Option<String>,
    pub status: Option<CourseStatus>,
    pub skill_tags: Option<Vec<String>>,
    pub notes: Option<String>,
}
