use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::goal::{GoalInput, UserGoalRow};
use crate::profile::public::{build_public_profile, PublicProfile};
use crate::state::AppState;

/// POST /api/v1/onboarding
pub async fn handle_onboarding(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<GoalInput>,
) -> Result<(StatusCode, Json<UserGoalRow>), AppError> {
    let goal = state.repo.create_goal(user.id, &input).await?;
    info!("User {} completed onboarding", user.id);
    Ok((StatusCode::CREATED, Json(goal)))
}

/// GET /api/v1/goals
pub async fn handle_get_goals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserGoalRow>, AppError> {
    let goal = state
        .repo
        .get_goal(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No goals set yet".to_string()))?;
    Ok(Json(goal))
}

/// PATCH /api/v1/goals
/// Only fields present in the body are changed.
pub async fn handle_update_goals(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<GoalInput>,
) -> Result<Json<UserGoalRow>, AppError> {
    let goal = state
        .repo
        .update_goal(user.id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("No goals set yet".to_string()))?;
    Ok(Json(goal))
}

/// POST /api/v1/profile/visibility
///
/// Takes the raw body so a non-boolean `isPublic` is a validation error
/// rather than a deserialization rejection.
pub async fn handle_set_visibility(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let is_public = body
        .get("isPublic")
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::Validation("isPublic must be a boolean".to_string()))?;

    if !state.repo.set_profile_visibility(user.id, is_public).await? {
        return Err(AppError::NotFound(
            "Complete onboarding before publishing a profile".to_string(),
        ));
    }

    info!("User {} set profile visibility to {is_public}", user.id);
    Ok(Json(json!({ "isPublic": is_public })))
}

/// GET /p/:user_id (no auth)
pub async fn handle_public_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfile>, AppError> {
    let not_found = || AppError::NotFound("Profile not found".to_string());
    let user_id = Uuid::parse_str(&user_id).map_err(|_| not_found())?;

    let goal = state.repo.get_goal(user_id).await?;
    if !goal.as_ref().is_some_and(|g| g.is_public) {
        return Err(not_found());
    }

    let skills = state.repo.list_skills(user_id).await?;
    let guidance = state.repo.get_guidance(user_id).await?;

    build_public_profile(goal.as_ref(), &skills, guidance.as_ref())
        .map(Json)
        .ok_or_else(not_found)
}
