//! In-memory stand-ins for every seam in `AppState`, used by unit and router tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{CompletionBackend, LlmError};
use crate::models::course::{CoursePatch, CourseRow, NewCourse};
use crate::models::document::{file_extension, DocumentRow, DocumentStatus, NewDocument};
use crate::models::goal::{GoalInput, UserGoalRow};
use crate::models::guidance::{CareerGuidanceRow, NewGuidance};
use crate::models::skill::{NewSkill, SkillRow, SkillType};
use crate::models::snapshot::SkillSnapshotRow;
use crate::queue::AnalysisQueue;
use crate::repository::{CompletedAnalysis, Repository};
use crate::skills::snapshot::build_snapshot;
use crate::state::AppState;
use crate::storage::{document_key, ObjectStore};

// ── Repository ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    documents: Vec<DocumentRow>,
    skills: Vec<SkillRow>,
    snapshots: Vec<SkillSnapshotRow>,
    goals: HashMap<Uuid, UserGoalRow>,
    guidance: HashMap<Uuid, CareerGuidanceRow>,
    courses: Vec<CourseRow>,
}

/// Repository calls that can be made to fail with a database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    GetDocument,
    FailDocument,
    /// The whole completion unit fails before anything is written.
    CompleteDocument,
    /// Skills are staged but the snapshot insert fails; the unit rolls back.
    SnapshotInsert,
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    failures: Mutex<HashSet<FailurePoint>>,
}

impl MemoryRepository {
    pub fn document(&self, id: Uuid) -> Option<DocumentRow> {
        let tables = self.tables.lock().unwrap();
        tables.documents.iter().find(|d| d.id == id).cloned()
    }

    /// Every later call through `point` fails until the repository is dropped.
    pub fn fail_on(&self, point: FailurePoint) {
        self.failures.lock().unwrap().insert(point);
    }

    fn check(&self, point: FailurePoint) -> Result<(), AppError> {
        if self.failures.lock().unwrap().contains(&point) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn apply(field: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        field.clone_from(value);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_document(&self, new: NewDocument) -> Result<DocumentRow, AppError> {
        let row = DocumentRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            filename: new.filename,
            storage_key: new.storage_key,
            storage_url: new.storage_url,
            status: DocumentStatus::Processing.as_str().to_string(),
            uploaded_at: Utc::now(),
        };
        self.tables.lock().unwrap().documents.push(row.clone());
        Ok(row)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        self.check(FailurePoint::GetDocument)?;
        Ok(self.document(id))
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .documents
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn fail_document(&self, id: Uuid) -> Result<bool, AppError> {
        self.check(FailurePoint::FailDocument)?;
        let mut tables = self.tables.lock().unwrap();
        match tables
            .documents
            .iter_mut()
            .find(|d| d.id == id && !d.status().is_terminal())
        {
            Some(document) => {
                document.status = DocumentStatus::Failed.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_document(
        &self,
        document: &DocumentRow,
        skills: &[NewSkill],
    ) -> Result<CompletedAnalysis, AppError> {
        self.check(FailurePoint::CompleteDocument)?;
        let mut tables = self.tables.lock().unwrap();
        let index = tables
            .documents
            .iter()
            .position(|d| d.id == document.id && !d.status().is_terminal())
            .ok_or_else(|| {
                AppError::Conflict(format!("Document {} is no longer processing", document.id))
            })?;

        let rows: Vec<SkillRow> = skills
            .iter()
            .map(|s| SkillRow {
                id: Uuid::new_v4(),
                user_id: document.user_id,
                document_id: document.id,
                name: s.name.clone(),
                category: s.category.clone(),
                skill_type: s.skill_type.as_str().to_string(),
                confidence: s.confidence,
                evidence: s.evidence.clone(),
                created_at: Utc::now(),
            })
            .collect();

        // Staged, not yet visible: any failure below leaves the tables untouched.
        let owned: Vec<SkillRow> = tables
            .skills
            .iter()
            .filter(|s| s.user_id == document.user_id)
            .chain(rows.iter())
            .cloned()
            .collect();
        let new = build_snapshot(document, &owned)?;
        self.check(FailurePoint::SnapshotInsert)?;

        let snapshot = SkillSnapshotRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            document_id: new.document_id,
            counts_by_type: new.counts_by_type,
            total_count: new.total_count,
            top_categories: new.top_categories,
            recorded_at: Utc::now(),
        };
        tables.documents[index].status = DocumentStatus::Completed.as_str().to_string();
        tables.skills.extend(rows.iter().cloned());
        tables.snapshots.push(snapshot.clone());
        Ok(CompletedAnalysis {
            skills: rows,
            snapshot,
        })
    }

    async fn list_skills(&self, user_id: Uuid) -> Result<Vec<SkillRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .skills
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self, user_id: Uuid) -> Result<Vec<SkillSnapshotRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_goal(&self, user_id: Uuid) -> Result<Option<UserGoalRow>, AppError> {
        Ok(self.tables.lock().unwrap().goals.get(&user_id).cloned())
    }

    async fn create_goal(
        &self,
        user_id: Uuid,
        input: &GoalInput,
    ) -> Result<UserGoalRow, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.goals.contains_key(&user_id) {
            return Err(AppError::Conflict("Onboarding already completed".to_string()));
        }
        let now = Utc::now();
        let row = UserGoalRow {
            user_id,
            career_goal: input.career_goal.clone(),
            education_level: input.education_level.clone(),
            current_study: input.current_study.clone(),
            study_year: input.study_year.clone(),
            top_priority: input.top_priority.clone(),
            courses: input.courses.clone(),
            is_public: false,
            onboarding_completed: true,
            created_at: now,
            updated_at: now,
        };
        tables.goals.insert(user_id, row.clone());
        Ok(row)
    }

    async fn update_goal(
        &self,
        user_id: Uuid,
        input: &GoalInput,
    ) -> Result<Option<UserGoalRow>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(goal) = tables.goals.get_mut(&user_id) else {
            return Ok(None);
        };
        apply(&mut goal.career_goal, &input.career_goal);
        apply(&mut goal.education_level, &input.education_level);
        apply(&mut goal.current_study, &input.current_study);
        apply(&mut goal.study_year, &input.study_year);
        apply(&mut goal.top_priority, &input.top_priority);
        apply(&mut goal.courses, &input.courses);
        goal.updated_at = Utc::now();
        Ok(Some(goal.clone()))
    }

    async fn set_profile_visibility(
        &self,
        user_id: Uuid,
        is_public: bool,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.goals.get_mut(&user_id) {
            Some(goal) => {
                goal.is_public = is_public;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_guidance(&self, user_id: Uuid) -> Result<Option<CareerGuidanceRow>, AppError> {
        Ok(self.tables.lock().unwrap().guidance.get(&user_id).cloned())
    }

    async fn upsert_guidance(&self, new: NewGuidance) -> Result<CareerGuidanceRow, AppError> {
        let gaps = serde_json::to_value(&new.gaps)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let row = CareerGuidanceRow {
            user_id: new.user_id,
            career_goal: new.career_goal,
            readiness_score: new.readiness_score,
            summary: new.summary,
            strengths: new.strengths,
            gaps,
            recommendations: new.recommendations,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .guidance
            .insert(row.user_id, row.clone());
        Ok(row)
    }

    async fn list_courses(&self, user_id: Uuid) -> Result<Vec<CourseRow>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .courses
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_course(&self, user_id: Uuid, new: NewCourse) -> Result<CourseRow, AppError> {
        let now = Utc::now();
        let row = CourseRow {
            id: Uuid::new_v4(),
            user_id,
            name: new.name,
            provider: new.provider,
            url: new.url,
            status: new.status.as_str().to_string(),
            skill_tags: new.skill_tags,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().courses.push(row.clone());
        Ok(row)
    }

    async fn update_course(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: &CoursePatch,
    ) -> Result<Option<CourseRow>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(course) = tables
            .courses
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            course.name.clone_from(name);
        }
        apply(&mut course.provider, &patch.provider);
        apply(&mut course.url, &patch.url);
        apply(&mut course.notes, &patch.notes);
        if let Some(status) = patch.status {
            course.status = status.as_str().to_string();
        }
        if let Some(tags) = &patch.skill_tags {
            course.skill_tags.clone_from(tags);
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.courses.len();
        tables
            .courses
            .retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(tables.courses.len() < before)
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

/// Replays queued replies in order and records every prompt it receives.
/// An exhausted script answers with `LlmError::EmptyContent`.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Some(reply.to_string()));
    }

    pub fn push_failure(&self) {
        self.replies.lock().unwrap().push_back(None);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(LlmError::Api {
                status: 529,
                message: "overloaded".to_string(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

// ── Identity, storage, queue ────────────────────────────────────────────────

/// Accepts a fixed set of tokens. `REVOKED_TOKEN` behaves like a deleted account.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: Mutex<HashMap<String, Uuid>>,
}

pub const REVOKED_TOKEN: &str = "revoked-token";

impl StaticIdentity {
    pub fn register(&self, token: &str, user_id: Uuid) {
        self.tokens.lock().unwrap().insert(token.to_string(), user_id);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, access_token: &str) -> Result<Uuid, AppError> {
        if access_token == REVOKED_TOKEN {
            return Err(AppError::SessionRevoked);
        }
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjectStore {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<String, AppError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(format!("http://storage.test/documents/{key}"))
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("No object stored under {key}")))
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<Uuid>>,
    unavailable: AtomicBool,
}

impl RecordingQueue {
    pub fn jobs(&self) -> Vec<Uuid> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnalysisQueue for RecordingQueue {
    async fn enqueue(&self, document_id: Uuid) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("queue unavailable")));
        }
        self.jobs.lock().unwrap().push(document_id);
        Ok(())
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/skillsync_test".to_string(),
        redis_url: "redis://localhost".to_string(),
        s3_bucket: "documents".to_string(),
        s3_endpoint: "http://storage.test".to_string(),
        s3_region: "us-east-1".to_string(),
        s3_public_url: "http://storage.test".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        identity_url: "http://identity.test".to_string(),
        identity_api_key: "test".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        max_upload_bytes: 1024 * 1024,
        llm_timeout_secs: 5,
        analysis_worker_enabled: false,
    }
}

/// A fully wired `AppState` with one signed-in user.
pub struct Harness {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    pub llm: Arc<ScriptedBackend>,
    pub storage: Arc<MemoryObjectStore>,
    pub queue: Arc<RecordingQueue>,
    pub user_id: Uuid,
    pub token: String,
}

impl Harness {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let llm = Arc::new(ScriptedBackend::default());
        let storage = Arc::new(MemoryObjectStore::default());
        let identity = Arc::new(StaticIdentity::default());
        let queue = Arc::new(RecordingQueue::default());

        let user_id = Uuid::new_v4();
        let token = "student-token".to_string();
        identity.register(&token, user_id);

        let state = AppState {
            repo: repo.clone(),
            llm: llm.clone(),
            storage: storage.clone(),
            identity,
            queue: queue.clone(),
            config: test_config(),
        };

        Self {
            state,
            repo,
            llm,
            storage,
            queue,
            user_id,
            token,
        }
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Stores `content` and creates a PROCESSING document for it.
    pub async fn seed_document(&self, filename: &str, content: &str) -> DocumentRow {
        let extension = file_extension(filename);
        let key = document_key(
            self.user_id,
            Utc::now().timestamp_millis(),
            extension.as_deref(),
        );
        let url = self
            .storage
            .put(&key, Bytes::from(content.to_string()), "text/plain")
            .await
            .unwrap();
        self.repo
            .create_document(NewDocument {
                user_id: self.user_id,
                filename: filename.to_string(),
                storage_key: key,
                storage_url: url,
            })
            .await
            .unwrap()
    }

    /// Adds skills as if one document had been analyzed.
    pub async fn seed_skills(&self, skills: &[(&str, &str, SkillType)]) -> CompletedAnalysis {
        let document = self.seed_document("seed.txt", "seed").await;
        let new: Vec<NewSkill> = skills
            .iter()
            .map(|(name, category, skill_type)| NewSkill {
                name: name.to_string(),
                category: category.to_string(),
                skill_type: *skill_type,
                confidence: 0.8,
                evidence: String::new(),
            })
            .collect();
        self.repo.complete_document(&document, &new).await.unwrap()
    }

    pub async fn seed_goal(&self, career_goal: &str) -> UserGoalRow {
        self.repo
            .create_goal(
                self.user_id,
                &GoalInput {
                    career_goal: Some(career_goal.to_string()),
                    current_study: Some("BSc Computer Science".to_string()),
                    ..GoalInput::default()
                },
            )
            .await
            .unwrap()
    }
}
