//! Snapshot Aggregator: rolls a user's skills up into a growth-timeline entry.
//!
//! Totals are recomputed from every skill the user owns, not accumulated as
//! deltas. Snapshots are append-only; an existing entry is never rewritten.
//! The row is written by `Repository::complete_document` in the same unit
//! that stores the skills, so a completed document always has its snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::models::skill::{SkillRow, SkillType};
use crate::models::snapshot::NewSnapshot;

pub const TOP_CATEGORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub technical: usize,
    pub soft: usize,
    pub transferable: usize,
}

impl TypeCounts {
    pub fn from_skills(skills: &[SkillRow]) -> Self {
        let mut counts = TypeCounts::default();
        for skill in skills {
            match skill.kind() {
                SkillType::Technical => counts.technical += 1,
                SkillType::Soft => counts.soft += 1,
                SkillType::Transferable => counts.transferable += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.technical + self.soft + self.transferable
    }
}

/// Categories with their skill counts, most frequent first.
/// Equal counts keep the order in which the category was first seen.
pub fn rank_categories(skills: &[SkillRow]) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for skill in skills {
        match index.get(skill.category.as_str()) {
            Some(&i) => ranked[i].1 += 1,
            None => {
                index.insert(skill.category.as_str(), ranked.len());
                ranked.push((skill.category.clone(), 1));
            }
        }
    }

    // sort_by is stable, which is what preserves first-seen order on ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillSummary {
    pub counts: TypeCounts,
    pub top_categories: Vec<String>,
}

/// `skills` must be in first-seen order.
pub fn summarize(skills: &[SkillRow]) -> SkillSummary {
    SkillSummary {
        counts: TypeCounts::from_skills(skills),
        top_categories: rank_categories(skills)
            .into_iter()
            .take(TOP_CATEGORY_LIMIT)
            .map(|(category, _)| category)
            .collect(),
    }
}

/// Snapshot row for `document`. `skills` are all of its owner's skills,
/// including the ones just extracted, in first-seen order.
pub fn build_snapshot(
    document: &DocumentRow,
    skills: &[SkillRow],
) -> Result<NewSnapshot, AppError> {
    let summary = summarize(skills);
    let counts_by_type = serde_json::to_value(summary.counts)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize counts: {e}")))?;

    Ok(NewSnapshot {
        user_id: document.user_id,
        document_id: document.id,
        counts_by_type,
        total_count: summary.counts.total() as i32,
        top_categories: summary.top_categories,
    })
}
