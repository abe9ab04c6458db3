use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::matching::matcher::{compare_to_job, MatchReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    #[serde(default)]
    pub job_description: Option<String>,
}

/// POST /api/v1/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CompareRequest>,
) -> Result<Json<MatchReport>, AppError> {
    let report = compare_to_job(
        state.repo.as_ref(),
        state.llm.as_ref(),
        user.id,
        req.job_description.as_deref(),
    )
    .await?;
    Ok(Json(report))
}
