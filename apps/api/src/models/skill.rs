use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    #[default]
    Technical,
    Soft,
    Transferable,
}

impl SkillType {
    pub const ALL: [SkillType; 3] = [SkillType::Technical, SkillType::Soft, SkillType::Transferable];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillType::Technical => "technical",
            SkillType::Soft => "soft",
            SkillType::Transferable => "transferable",
        }
    }

    /// Lenient parse used for model output: anything unrecognised is technical.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "soft" => SkillType::Soft,
            "transferable" => SkillType::Transferable,
            _ => SkillType::Technical,
        }
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SkillRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub name: String,
    pub category: String,
    pub skill_type: String,
    pub confidence: f64,
    pub evidence: String,
    pub created_at: DateTime<Utc>,
}

impl SkillRow {
    pub fn kind(&self) -> SkillType {
        SkillType::from_label(&self.skill_type)
    }
}

/// A validated skill ready to be inserted for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSkill {
    pub name: String,
    pub category: String,
    pub skill_type: SkillType,
    pub confidence: f64,
    pub evidence: String,
}
