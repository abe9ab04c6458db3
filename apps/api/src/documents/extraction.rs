//! Extraction Adapter: turns document text into validated skill records.
//!
//! Flow: terminal check → format denylist → fetch bytes → truncate →
//!       LLM classify → parse/validate → store skills + snapshot + COMPLETED.
//!
//! Any failure after the document is picked up marks it FAILED, so the
//! outcome is visible on the next read. Extraction is all-or-nothing: the
//! skills, the snapshot and the status flip are written as one unit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::prompts::{build_extraction_prompt, EXTRACTION_ROLE};
use crate::errors::AppError;
use crate::llm_client::prompts::{json_system, truncate_chars};
use crate::llm_client::{coerce_number, parse_json, CompletionBackend, LlmError};
use crate::models::document::{file_extension, DocumentRow, DocumentStatus};
use crate::models::skill::{NewSkill, SkillType};
use crate::repository::Repository;
use crate::state::AppState;
use crate::storage::ObjectStore;

/// Characters of document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 15_000;

/// Formats the model cannot read as plain text. Rejected before any model call.
pub const DENYLISTED_EXTENSIONS: &[&str] = &["pdf"];

pub const UNSUPPORTED_FORMAT_MESSAGE: &str =
    "PDF files are not supported. Please upload a text file.";

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// One element of the model's JSON array, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtractedSkill {
    skill_name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    skill_type: Option<String>,
    /// Number or numeric string; anything else falls back to the default.
    #[serde(default)]
    confidence_score: Option<Value>,
    #[serde(default)]
    evidence_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub document_id: Uuid,
    pub status: DocumentStatus,
    pub skill_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collaborators needed to analyze a document.
pub struct AnalysisContext<'a> {
    pub repo: &'a dyn Repository,
    pub storage: &'a dyn ObjectStore,
    pub llm: &'a dyn CompletionBackend,
}

impl<'a> AnalysisContext<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            repo: state.repo.as_ref(),
            storage: state.storage.as_ref(),
            llm: state.llm.as_ref(),
        }
    }
}

pub fn is_denylisted(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| DENYLISTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Parses and validates the model's reply.
///
/// A reply that is not a JSON array of objects with `skillName` is rejected
/// whole. Optional fields are defaulted, never rejected.
pub fn parse_extraction_response(text: &str) -> Result<Vec<NewSkill>, ExtractionError> {
    let raw: Vec<RawExtractedSkill> = parse_json(text)?;

    raw.into_iter()
        .enumerate()
        .map(|(i, skill)| {
            let name = skill.skill_name.trim().to_string();
            if name.is_empty() {
                return Err(ExtractionError::Malformed(format!(
                    "entry {i} has an empty skillName"
                )));
            }
            let category = skill
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            let skill_type = skill
                .skill_type
                .as_deref()
                .map(SkillType::from_label)
                .unwrap_or_default();
            let confidence = skill
                .confidence_score
                .as_ref()
                .and_then(coerce_number)
                .unwrap_or(DEFAULT_CONFIDENCE)
                .clamp(0.0, 1.0);

            Ok(NewSkill {
                name,
                category,
                skill_type,
                confidence,
                evidence: skill.evidence_text.unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Runs extraction for a PROCESSING document.
pub async fn analyze_document(
    ctx: &AnalysisContext<'_>,
    document: &DocumentRow,
) -> Result<AnalysisOutcome, AppError> {
    if document.status().is_terminal() {
        return Err(AppError::Conflict(format!(
            "Document {} has already been analyzed ({})",
            document.id,
            document.status()
        )));
    }

    if is_denylisted(&document.filename) {
        mark_failed(ctx.repo, document.id).await?;
        info!(
            "Rejected document {} ({}): unsupported format",
            document.id, document.filename
        );
        return Ok(AnalysisOutcome {
            document_id: document.id,
            status: DocumentStatus::Failed,
            skill_count: 0,
            snapshot_id: None,
            error: Some(UNSUPPORTED_FORMAT_MESSAGE.to_string()),
        });
    }

    let bytes = match ctx.storage.get(&document.storage_key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            mark_failed(ctx.repo, document.id).await?;
            return Err(e);
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    let prompt = build_extraction_prompt(truncate_chars(&text, MAX_DOCUMENT_CHARS));
    let system = json_system(EXTRACTION_ROLE);

    let skills = match extract_skills(ctx.llm, &prompt, &system).await {
        Ok(skills) => skills,
        Err(e) => {
            warn!("Skill extraction failed for document {}: {e}", document.id);
            mark_failed(ctx.repo, document.id).await?;
            return Err(AppError::Llm(format!(
                "Skill extraction failed for document {}: {e}",
                document.id
            )));
        }
    };

    let completed = match ctx.repo.complete_document(document, &skills).await {
        Ok(completed) => completed,
        Err(e @ AppError::Conflict(_)) => return Err(e),
        Err(e) => {
            error!("Failed to store analysis of document {}: {e}", document.id);
            if let Err(mark_err) = mark_failed(ctx.repo, document.id).await {
                error!("Document {} left PROCESSING: {mark_err}", document.id);
            }
            return Err(e);
        }
    };

    info!(
        "Document {} COMPLETED with {} skills (snapshot total {})",
        document.id,
        completed.skills.len(),
        completed.snapshot.total_count
    );

    Ok(AnalysisOutcome {
        document_id: document.id,
        status: DocumentStatus::Completed,
        skill_count: completed.skills.len(),
        snapshot_id: Some(completed.snapshot.id),
        error: None,
    })
}

async fn extract_skills(
    llm: &dyn CompletionBackend,
    prompt: &str,
    system: &str,
) -> Result<Vec<NewSkill>, ExtractionError> {
    let text = llm.complete(prompt, system).await?;
    parse_extraction_response(&text)
}

async fn mark_failed(repo: &dyn Repository, document_id: Uuid) -> Result<(), AppError> {
    if !repo.fail_document(document_id).await? {
        error!("Document {document_id} was already terminal when marking it FAILED");
    }
    Ok(())
}
