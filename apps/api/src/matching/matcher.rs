//! Job Matcher: one model call comparing the user's skills to a job description.
//!
//! Input is validated before the call. The reply is never trusted: every
//! field is coerced, and a reply that is not JSON at all yields the
//! all-default report instead of an error.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::{json_system, truncate_chars};
use crate::llm_client::{coerce_number, parse_json, CompletionBackend};
use crate::matching::prompts::{build_match_prompt, MATCH_ROLE};
use crate::models::skill::SkillRow;
use crate::repository::Repository;

/// Minimum trimmed length, in characters.
pub const MIN_JOB_DESCRIPTION_CHARS: usize = 20;
/// Characters of the description sent to the model.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 4_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub match_score: u8,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub verdict: String,
}

/// Numbers and numeric strings are accepted; anything else scores 0.
pub fn coerce_score(value: &Value) -> u8 {
    coerce_number(value)
        .map(|s| s.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn normalize_report(value: &Value) -> MatchReport {
    MatchReport {
        match_score: value.get("matchScore").map(coerce_score).unwrap_or(0),
        matched_skills: string_list(value.get("matchedSkills")),
        missing_skills: string_list(value.get("missingSkills")),
        verdict: value
            .get("verdict")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

pub fn parse_match_response(text: &str) -> MatchReport {
    let value: Value = parse_json(text).unwrap_or_else(|e| {
        warn!("Job match reply was not JSON, using defaults: {e}");
        Value::Null
    });
    normalize_report(&value)
}

/// `name (type)` entries joined with ", ".
pub fn skill_list(skills: &[SkillRow]) -> String {
    skills
        .iter()
        .map(|s| format!("{} ({})", s.name, s.kind()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn validate_job_description(raw: Option<&str>) -> Result<&str, AppError> {
    let description = raw.map(str::trim).unwrap_or_default();
    if description.chars().count() < MIN_JOB_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "Please provide a job description (at least {MIN_JOB_DESCRIPTION_CHARS} characters)"
        )));
    }
    Ok(description)
}

pub async fn compare_to_job(
    repo: &dyn Repository,
    llm: &dyn CompletionBackend,
    user_id: Uuid,
    job_description: Option<&str>,
) -> Result<MatchReport, AppError> {
    let description = validate_job_description(job_description)?;

    let skills = repo.list_skills(user_id).await?;
    if skills.is_empty() {
        return Err(AppError::Validation(
            "No skills found. Upload a document first to extract your skills.".to_string(),
        ));
    }

    let prompt = build_match_prompt(
        &skill_list(&skills),
        truncate_chars(description, MAX_JOB_DESCRIPTION_CHARS),
    );
    let text = llm
        .complete(&prompt, &json_system(MATCH_ROLE))
        .await
        .map_err(|e| AppError::Llm(format!("Job match request failed: {e}")))?;

    Ok(parse_match_response(&text))
}
