use axum::{extract::State, Json};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::guidance::readiness::generate_guidance;
use crate::models::guidance::CareerGuidanceRow;
use crate::state::AppState;

/// GET /api/v1/career-guidance
/// Returns `null` until guidance has been generated once.
pub async fn handle_get_guidance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Option<CareerGuidanceRow>>, AppError> {
    Ok(Json(state.repo.get_guidance(user.id).await?))
}

/// POST /api/v1/career-guidance
pub async fn handle_generate_guidance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CareerGuidanceRow>, AppError> {
    let guidance = generate_guidance(state.repo.as_ref(), state.llm.as_ref(), user.id).await?;
    Ok(Json(guidance))
}
