use axum::{extract::State, Json};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::skill::SkillRow;
use crate::models::snapshot::SkillSnapshotRow;
use crate::skills::insights::{compute_insights, Insights};
use crate::state::AppState;

/// GET /api/v1/skills
pub async fn handle_list_skills(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SkillRow>>, AppError> {
    Ok(Json(state.repo.list_skills(user.id).await?))
}

/// GET /api/v1/skills/history
pub async fn handle_skill_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SkillSnapshotRow>>, AppError> {
    Ok(Json(state.repo.list_snapshots(user.id).await?))
}

/// GET /api/v1/dashboard
///
/// Requires a completed onboarding; otherwise the client is sent to onboarding.
pub async fn handle_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Insights>, AppError> {
    state
        .repo
        .get_goal(user.id)
        .await?
        .filter(|g| g.onboarding_completed)
        .ok_or(AppError::OnboardingRequired)?;

    let skills = state.repo.list_skills(user.id).await?;
    let documents = state.repo.list_documents(user.id).await?;
    let snapshots = state.repo.list_snapshots(user.id).await?;
    let guidance = state.repo.get_guidance(user.id).await?;

    Ok(Json(compute_insights(
        &skills,
        &documents,
        &snapshots,
        guidance.as_ref(),
    )))
}
