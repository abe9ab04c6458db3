//! Persistence seam.
//!
//! Every handler and pipeline step talks to storage through `Repository`.
//! `PgRepository` is the production backend; tests use the in-memory
//! implementation in `crate::testing`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::course::{CoursePatch, CourseRow, NewCourse};
use crate::models::document::{DocumentRow, NewDocument};
use crate::models::goal::{GoalInput, UserGoalRow};
use crate::models::guidance::{CareerGuidanceRow, NewGuidance};
use crate::models::skill::{NewSkill, SkillRow};
use crate::models::snapshot::SkillSnapshotRow;

pub mod postgres;

pub use postgres::PgRepository;

/// What a successful `complete_document` wrote.
#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    pub skills: Vec<SkillRow>,
    pub snapshot: SkillSnapshotRow,
}

#[async_trait]
pub trait Repository: Send + Sync {
    // Documents
    async fn create_document(&self, new: NewDocument) -> Result<DocumentRow, AppError>;
    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError>;
    /// Newest first.
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError>;
    /// Moves a PROCESSING document to FAILED. Returns false if it was already terminal.
    async fn fail_document(&self, id: Uuid) -> Result<bool, AppError>;
    /// Inserts the extracted skills, appends the owner's growth snapshot and
    /// moves the document to COMPLETED in one unit. Nothing is written on error.
    /// Fails with `AppError::Conflict` if the document is no longer PROCESSING.
    async fn complete_document(
        &self,
        document: &DocumentRow,
        skills: &[NewSkill],
    ) -> Result<CompletedAnalysis, AppError>;

    // Skills
    /// Insertion order (first seen first).
    async fn list_skills(&self, user_id: Uuid) -> Result<Vec<SkillRow>, AppError>;

    // Snapshots
    /// Oldest first.
    async fn list_snapshots(&self, user_id: Uuid) -> Result<Vec<SkillSnapshotRow>, AppError>;

    // Goals
    async fn get_goal(&self, user_id: Uuid) -> Result<Option<UserGoalRow>, AppError>;
    /// Fails with `AppError::Conflict` if the user already onboarded.
    async fn create_goal(&self, user_id: Uuid, input: &GoalInput)
        -> Result<UserGoalRow, AppError>;
    async fn update_goal(
        &self,
        user_id: Uuid,
        input: &GoalInput,
    ) -> Result<Option<UserGoalRow>, AppError>;
    /// Returns false if the user has no goal row to update.
    async fn set_profile_visibility(&self, user_id: Uuid, is_public: bool)
        -> Result<bool, AppError>;

    // Career guidance
    async fn get_guidance(&self, user_id: Uuid) -> Result<Option<CareerGuidanceRow>, AppError>;
    async fn upsert_guidance(&self, new: NewGuidance) -> Result<CareerGuidanceRow, AppError>;

    // Courses
    /// Newest first.
    async fn list_courses(&self, user_id: Uuid) -> Result<Vec<CourseRow>, AppError>;
    async fn create_course(&self, user_id: Uuid, new: NewCourse) -> Result<CourseRow, AppError>;
    async fn update_course(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &CoursePatch,
    ) -> Result<Option<CourseRow>, AppError>;
    async fn delete_course(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}
