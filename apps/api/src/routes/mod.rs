pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;
use crate::{courses, documents, guidance, matching, profile, skills};

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route(
            "/api/v1/documents/upload",
            post(documents::handlers::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/documents", get(documents::handlers::handle_list_documents))
        .route(
            "/api/v1/documents/analyze",
            post(documents::handlers::handle_analyze),
        )
        // Skills
        .route("/api/v1/skills", get(skills::handlers::handle_list_skills))
        .route(
            "/api/v1/skills/history",
            get(skills::handlers::handle_skill_history),
        )
        .route("/api/v1/dashboard", get(skills::handlers::handle_dashboard))
        // Goals and profile
        .route("/api/v1/onboarding", post(profile::handlers::handle_onboarding))
        .route(
            "/api/v1/goals",
            get(profile::handlers::handle_get_goals).patch(profile::handlers::handle_update_goals),
        )
        .route(
            "/api/v1/profile/visibility",
            post(profile::handlers::handle_set_visibility),
        )
        // Courses
        .route(
            "/api/v1/courses",
            get(courses::handlers::handle_list_courses).post(courses::handlers::handle_create_course),
        )
        .route(
            "/api/v1/courses/:id",
            patch(courses::handlers::handle_update_course)
                .delete(courses::handlers::handle_delete_course),
        )
        // Career guidance and job matching
        .route(
            "/api/v1/career-guidance",
            get(guidance::handlers::handle_get_guidance)
                .post(guidance::handlers::handle_generate_guidance),
        )
        .route("/api/v1/compare", post(matching::handlers::handle_compare))
        // Public, unauthenticated
        .route("/p/:user_id", get(profile::handlers::handle_public_profile))
        .with_state(state)
}
