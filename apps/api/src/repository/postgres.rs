use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::course::{CoursePatch, CourseRow, NewCourse};
use crate::models::document::{DocumentRow, DocumentStatus, NewDocument};
use crate::models::goal::{GoalInput, UserGoalRow};
use crate::models::guidance::{CareerGuidanceRow, NewGuidance};
use crate::models::skill::{NewSkill, SkillRow};
use crate::models::snapshot::SkillSnapshotRow;
use crate::repository::{CompletedAnalysis, Repository};
use crate::skills::snapshot::build_snapshot;

const DOCUMENT_COLUMNS: &str = "id, user_id, filename, storage_key, storage_url, status, uploaded_at";
const SKILL_COLUMNS: &str =
    "id, user_id, document_id, name, category, skill_type, confidence, evidence, created_at";
const SNAPSHOT_COLUMNS: &str =
    "id, user_id, document_id, counts_by_type, total_count, top_categories, recorded_at";
const GUIDANCE_COLUMNS: &str = "user_id, career_goal, readiness_score, summary, strengths, gaps, \
     recommendations, created_at";
const GOAL_COLUMNS: &str = "user_id, career_goal, education_level, current_study, study_year, \
     top_priority, courses, is_public, onboarding_completed, created_at, updated_at";
const COURSE_COLUMNS: &str =
    "id, user_id, name, provider, url, status, skill_tags, notes, created_at, updated_at";

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_document(&self, new: NewDocument) -> Result<DocumentRow, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents (user_id, filename, storage_key, storage_url, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.filename)
        .bind(&new.storage_key)
        .bind(&new.storage_url)
        .bind(DocumentStatus::Processing.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError> {
        Ok(sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn fail_document(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE documents SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(DocumentStatus::Failed.as_str())
            .bind(DocumentStatus::Processing.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_document(
        &self,
        document: &DocumentRow,
        skills: &[NewSkill],
    ) -> Result<CompletedAnalysis, AppError> {
        let mut tx = self.pool.begin().await?;

        // Conditional flip first: a concurrent analysis loses here and rolls back.
        let flipped =
            sqlx::query("UPDATE documents SET status = $2 WHERE id = $1 AND status = $3")
                .bind(document.id)
                .bind(DocumentStatus::Completed.as_str())
                .bind(DocumentStatus::Processing.as_str())
                .execute(&mut *tx)
                .await?;
        if flipped.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Document {} has already been analyzed",
                document.id
            )));
        }

        let insert_sql = format!(
            "INSERT INTO skills \
                (user_id, document_id, name, category, skill_type, confidence, evidence) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {SKILL_COLUMNS}"
        );
        let mut rows = Vec::with_capacity(skills.len());
        for skill in skills {
            let row = sqlx::query_as::<_, SkillRow>(&insert_sql)
                .bind(document.user_id)
                .bind(document.id)
                .bind(&skill.name)
                .bind(&skill.category)
                .bind(skill.skill_type.as_str())
                .bind(skill.confidence)
                .bind(&skill.evidence)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        // Serializes snapshot totals per user when two documents finish at once.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(document.user_id)
            .execute(&mut *tx)
            .await?;

        let owned = sqlx::query_as::<_, SkillRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE user_id = $1 ORDER BY seq ASC"
        ))
        .bind(document.user_id)
        .fetch_all(&mut *tx)
        .await?;

        let new = build_snapshot(document, &owned)?;
        let snapshot = sqlx::query_as::<_, SkillSnapshotRow>(&format!(
            "INSERT INTO skill_snapshots \
                (user_id, document_id, counts_by_type, total_count, top_categories) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SNAPSHOT_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.document_id)
        .bind(&new.counts_by_type)
        .bind(new.total_count)
        .bind(&new.top_categories)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Stored {} skills and snapshot {} for document {} (user {}, total {})",
            rows.len(),
            snapshot.id,
            document.id,
            document.user_id,
            snapshot.total_count
        );
        Ok(CompletedAnalysis {
            skills: rows,
            snapshot,
        })
    }

    async fn list_skills(&self, user_id: Uuid) -> Result<Vec<SkillRow>, AppError> {
        Ok(sqlx::query_as::<_, SkillRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE user_id = $1 ORDER BY seq ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_snapshots(&self, user_id: Uuid) -> Result<Vec<SkillSnapshotRow>, AppError> {
        Ok(sqlx::query_as::<_, SkillSnapshotRow>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM skill_snapshots \
             WHERE user_id = $1 ORDER BY seq ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_goal(&self, user_id: Uuid) -> Result<Option<UserGoalRow>, AppError> {
        Ok(sqlx::query_as::<_, UserGoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM user_goals WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_goal(
        &self,
        user_id: Uuid,
        input: &GoalInput,
    ) -> Result<UserGoalRow, AppError> {
        sqlx::query_as::<_, UserGoalRow>(&format!(
            "INSERT INTO user_goals \
                (user_id, career_goal, education_level, current_study, study_year, \
                 top_priority, courses, onboarding_completed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE) \
             ON CONFLICT (user_id) DO NOTHING \
             RETURNING {GOAL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&input.career_goal)
        .bind(&input.education_level)
        .bind(&input.current_study)
        .bind(&input.study_year)
        .bind(&input.top_priority)
        .bind(&input.courses)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Onboarding has already been completed".to_string()))
    }

    async fn update_goal(
        &self,
        user_id: Uuid,
        input: &GoalInput,
    ) -> Result<Option<UserGoalRow>, AppError> {
        Ok(sqlx::query_as::<_, UserGoalRow>(&format!(
            "UPDATE user_goals SET \
                career_goal = COALESCE($2, career_goal), \
                education_level = COALESCE($3, education_level), \
                current_study = COALESCE($4, current_study), \
                study_year = COALESCE($5, study_year), \
                top_priority = COALESCE($6, top_priority), \
                courses = COALESCE($7, courses), \
                updated_at = now() \
             WHERE user_id = $1 \
             RETURNING {GOAL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&input.career_goal)
        .bind(&input.education_level)
        .bind(&input.current_study)
        .bind(&input.study_year)
        .bind(&input.top_priority)
        .bind(&input.courses)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_profile_visibility(
        &self,
        user_id: Uuid,
        is_public: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE user_goals SET is_public = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(is_public)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_guidance(&self, user_id: Uuid) -> Result<Option<CareerGuidanceRow>, AppError> {
        Ok(sqlx::query_as::<_, CareerGuidanceRow>(&format!(
            "SELECT {GUIDANCE_COLUMNS} FROM career_guidance WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_guidance(&self, new: NewGuidance) -> Result<CareerGuidanceRow, AppError> {
        let gaps = serde_json::to_value(&new.gaps)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize gaps: {e}")))?;

        // Full replace: a regenerated assessment keeps nothing from the previous one.
        Ok(sqlx::query_as::<_, CareerGuidanceRow>(&format!(
            "INSERT INTO career_guidance \
                (user_id, career_goal, readiness_score, summary, strengths, gaps, recommendations) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
                career_goal = EXCLUDED.career_goal, \
                readiness_score = EXCLUDED.readiness_score, \
                summary = EXCLUDED.summary, \
                strengths = EXCLUDED.strengths, \
                gaps = EXCLUDED.gaps, \
                recommendations = EXCLUDED.recommendations, \
                created_at = now() \
             RETURNING {GUIDANCE_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.career_goal)
        .bind(new.readiness_score)
        .bind(&new.summary)
        .bind(&new.strengths)
        .bind(&gaps)
        .bind(&new.recommendations)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_courses(&self, user_id: Uuid) -> Result<Vec<CourseRow>, AppError> {
        Ok(sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_course(&self, user_id: Uuid, new: NewCourse) -> Result<CourseRow, AppError> {
        Ok(sqlx::query_as::<_, CourseRow>(&format!(
            "INSERT INTO courses (user_id, name, provider, url, status, skill_tags, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.provider)
        .bind(&new.url)
        .bind(new.status.as_str())
        .bind(&new.skill_tags)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_course(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &CoursePatch,
    ) -> Result<Option<CourseRow>, AppError> {
        Ok(sqlx::query_as::<_, CourseRow>(&format!(
            "UPDATE courses SET \
                name = COALESCE($3, name), \
                provider = COALESCE($4, provider), \
                url = COALESCE($5, url), \
                status = COALESCE($6, status), \
                skill_tags = COALESCE($7, skill_tags), \
                notes = COALESCE($8, notes), \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&patch.name)
        .bind(&patch.provider)
        .bind(&patch.url)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.skill_tags.clone())
        .bind(&patch.notes)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_course(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
