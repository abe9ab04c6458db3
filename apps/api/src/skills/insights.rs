//! Dashboard rollup: skill mix, category leaders, document pipeline health,
//! and the growth timeline built from snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::document::{DocumentRow, DocumentStatus};
use crate::models::guidance::CareerGuidanceRow;
use crate::models::skill::SkillRow;
use crate::models::snapshot::SkillSnapshotRow;
use crate::skills::snapshot::{rank_categories, TypeCounts};

pub const DASHBOARD_CATEGORY_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentStats {
    pub completed: usize,
    pub failed: usize,
    pub processing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub recorded_at: DateTime<Utc>,
    pub total: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_skills: usize,
    pub counts: TypeCounts,
    pub top_categories: Vec<CategoryCount>,
    pub documents: DocumentStats,
    pub timeline: Vec<TimelinePoint>,
    /// Last snapshot total minus the first; absent with fewer than two snapshots.
    pub growth_delta: Option<i64>,
    pub readiness_score: Option<i32>,
}

pub fn compute_insights(
    skills: &[SkillRow],
    documents: &[DocumentRow],
    snapshots: &[SkillSnapshotRow],
    guidance: Option<&CareerGuidanceRow>,
) -> Insights {
    let counts = TypeCounts::from_skills(skills);

    let top_categories = rank_categories(skills)
        .into_iter()
        .take(DASHBOARD_CATEGORY_LIMIT)
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    let mut stats = DocumentStats::default();
    for document in documents {
        match document.status() {
            DocumentStatus::Completed => stats.completed += 1,
            DocumentStatus::Failed => stats.failed += 1,
            DocumentStatus::Processing => stats.processing += 1,
        }
    }

    let mut timeline: Vec<TimelinePoint> = snapshots
        .iter()
        .map(|s| TimelinePoint {
            recorded_at: s.recorded_at,
            total: s.total_count,
        })
        .collect();
    timeline.sort_by_key(|p| p.recorded_at);

    let growth_delta = match (timeline.first(), timeline.last()) {
        (Some(first), Some(last)) if timeline.len() >= 2 => {
            Some(i64::from(last.total) - i64::from(first.total))
        }
        _ => None,
    };

    Insights {
        total_skills: skills.len(),
        counts,
        top_categories,
        documents: stats,
        timeline,
        growth_delta,
        readiness_score: guidance.map(|g| g.readiness_score),
    }
}
