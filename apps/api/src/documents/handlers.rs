use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::documents::extraction::{analyze_document, AnalysisContext, AnalysisOutcome};
use crate::errors::AppError;
use crate::models::document::{file_extension, DocumentRow, NewDocument};
use crate::state::AppState;
use crate::storage::document_key;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

struct Upload {
    filename: String,
    content_type: String,
    body: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().trim().to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;

        if filename.is_empty() {
            return Err(AppError::Validation("Uploaded file has no filename".to_string()));
        }
        if body.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        return Ok(Upload {
            filename,
            content_type,
            body,
        });
    }

    Err(AppError::Validation("No file provided".to_string()))
}

/// POST /api/v1/documents/upload
///
/// Stores the file, records a PROCESSING document and queues it for analysis.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    let upload = read_upload(&mut multipart).await?;

    let extension = file_extension(&upload.filename);
    let key = document_key(user.id, Utc::now().timestamp_millis(), extension.as_deref());
    let url = state
        .storage
        .put(&key, upload.body, &upload.content_type)
        .await?;

    let document = state
        .repo
        .create_document(NewDocument {
            user_id: user.id,
            filename: upload.filename,
            storage_key: key,
            storage_url: url,
        })
        .await?;

    info!(
        "Document {} uploaded by user {} ({})",
        document.id, user.id, document.filename
    );

    // The document stays PROCESSING; POST /documents/analyze can still pick it up.
    if let Err(e) = state.queue.enqueue(document.id).await {
        warn!("Failed to queue analysis for document {}: {e}", document.id);
    }

    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    Ok(Json(state.repo.list_documents(user.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub document_id: Option<String>,
}

/// POST /api/v1/documents/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let raw_id = req
        .document_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Document ID required".to_string()))?;
    let document_id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::Validation(format!("Invalid document ID '{raw_id}'")))?;

    // Someone else's document is reported exactly like a missing one.
    let document = state
        .repo
        .get_document(document_id)
        .await?
        .filter(|d| d.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))?;

    let outcome = analyze_document(&AnalysisContext::from_state(&state), &document).await?;
    Ok(Json(outcome))
}
