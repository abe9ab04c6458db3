//! Readiness Scorer: asks the model how ready a student is for their stated
//! career goal and stores the answer as the user's single guidance record.
//!
//! Both preconditions (a career goal and at least one skill) are checked
//! before any model call. A reply without a numeric `readinessScore` is an
//! upstream failure; every other field is normalized.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::guidance::prompts::{build_readiness_prompt, READINESS_ROLE};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{parse_json, CompletionBackend, LlmError};
use crate::models::guidance::{CareerGuidanceRow, GuidanceGap, NewGuidance};
use crate::repository::Repository;

const DEFAULT_IMPORTANCE: &str = "medium";
const IMPORTANCE_LEVELS: &[&str] = &["high", "medium", "low"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssessment {
    readiness_score: f64,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    strengths: Option<Value>,
    #[serde(default)]
    gaps: Option<Value>,
    #[serde(default)]
    recommendations: Option<Value>,
}

/// Normalized model answer, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub readiness_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<GuidanceGap>,
    pub recommendations: Vec<String>,
}

pub fn clamp_readiness(score: f64) -> i32 {
    score.round().clamp(0.0, 100.0) as i32
}

pub fn normalize_importance(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| IMPORTANCE_LEVELS.contains(&s.as_str()))
        .unwrap_or_else(|| DEFAULT_IMPORTANCE.to_string())
}

fn string_items(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn gap_items(value: Option<Value>) -> Vec<GuidanceGap> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let skill = item.get("skill")?.as_str()?.trim();
            if skill.is_empty() {
                return None;
            }
            Some(GuidanceGap {
                skill: skill.to_string(),
                importance: normalize_importance(item.get("importance").and_then(Value::as_str)),
                suggestion: item
                    .get("suggestion")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            })
        })
        .collect()
}

pub fn parse_assessment(text: &str) -> Result<Assessment, LlmError> {
    let raw: RawAssessment = parse_json(text)?;
    Ok(Assessment {
        readiness_score: clamp_readiness(raw.readiness_score),
        summary: raw.summary.unwrap_or_default().trim().to_string(),
        strengths: string_items(raw.strengths),
        gaps: gap_items(raw.gaps),
        recommendations: string_items(raw.recommendations),
    })
}

/// Regenerates and stores guidance for `user_id`, replacing any previous record.
pub async fn generate_guidance(
    repo: &dyn Repository,
    llm: &dyn CompletionBackend,
    user_id: Uuid,
) -> Result<CareerGuidanceRow, AppError> {
    let goal = repo.get_goal(user_id).await?;
    let (goal, career_goal) = goal
        .as_ref()
        .and_then(|g| g.career_goal().map(|c| (g, c)))
        .ok_or_else(|| {
            AppError::Precondition(
                "No career goal set. Please complete onboarding first.".to_string(),
            )
        })?;

    let skills = repo.list_skills(user_id).await?;
    if skills.is_empty() {
        return Err(AppError::Precondition(
            "No skills found. Please upload and analyze some documents first.".to_string(),
        ));
    }

    let prompt = build_readiness_prompt(career_goal, goal, &skills);
    let text = llm
        .complete(&prompt, &json_system(READINESS_ROLE))
        .await
        .map_err(|e| AppError::Llm(format!("Career guidance request failed: {e}")))?;

    let assessment = parse_assessment(&text).map_err(|e| {
        warn!("Unusable career guidance reply for user {user_id}: {e}");
        AppError::Llm(format!("Failed to parse career guidance: {e}"))
    })?;

    let guidance = repo
        .upsert_guidance(NewGuidance {
            user_id,
            career_goal: career_goal.to_string(),
            readiness_score: assessment.readiness_score,
            summary: assessment.summary,
            strengths: assessment.strengths,
            gaps: assessment.gaps,
            recommendations: assessment.recommendations,
        })
        .await?;

    info!(
        "Career guidance upserted for user {user_id} (readiness {})",
        guidance.readiness_score
    );
    Ok(guidance)
}
