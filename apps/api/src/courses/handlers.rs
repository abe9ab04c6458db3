use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::course::{CoursePatch, CourseStatus, NewCourse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub skill_tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Trims tags, drops blanks and case-insensitive duplicates; first spelling wins.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let key = tag.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(tag.to_string());
        }
    }
    out
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Course name is required".to_string()));
    }
    Ok(name.to_string())
}

fn parse_status(status: &str) -> Result<CourseStatus, AppError> {
    status.parse().map_err(AppError::Validation)
}

pub fn new_course(req: CourseRequest) -> Result<NewCourse, AppError> {
    Ok(NewCourse {
        name: required_name(req.name.as_deref().unwrap_or_default())?,
        status: req.status.as_deref().map(parse_status).transpose()?.unwrap_or_default(),
        provider: optional_text(req.provider),
        url: optional_text(req.url),
        skill_tags: normalize_tags(req.skill_tags.unwrap_or_default()),
        notes: optional_text(req.notes),
    })
}

pub fn course_patch(req: CourseRequest) -> Result<CoursePatch, AppError> {
    Ok(CoursePatch {
        name: req.name.as_deref().map(required_name).transpose()?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        provider: req.provider.map(|v| v.trim().to_string()),
        url: req.url.map(|v| v.trim().to_string()),
        skill_tags: req.skill_tags.map(normalize_tags),
        notes: req.notes.map(|v| v.trim().to_string()),
    })
}

fn course_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Course {raw} not found")))
}

/// GET /api/v1/courses
pub async fn handle_list_courses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let courses = state.repo.list_courses(user.id).await?;
    Ok(Json(json!({ "courses": courses })))
}

/// POST /api/v1/courses
pub async fn handle_create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CourseRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let course = state.repo.create_course(user.id, new_course(req)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "course": course }))))
}

/// PATCH /api/v1/courses/:id
pub async fn handle_update_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CourseRequest>,
) -> Result<Json<Value>, AppError> {
    let id = course_id(&id)?;
    let patch = course_patch(req)?;
    let course = state
        .repo
        .update_course(id, user.id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {id} not found")))?;
    Ok(Json(json!({ "course": course })))
}

/// DELETE /api/v1/courses/:id
pub async fn handle_delete_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = course_id(&id)?;
    if !state.repo.delete_course(id, user.id).await? {
        return Err(AppError::NotFound(format!("Course {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}
