//! Background analysis worker.
//!
//! Claims document ids from the Redis queue one at a time and runs the
//! extraction pipeline on them. A job is acknowledged only once its document
//! has reached a terminal status, so a crash mid-analysis leaves it on this
//! worker's processing list for a live worker to requeue. A separate task
//! keeps the worker's heartbeat alive and recovers jobs of dead workers.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::extraction::{analyze_document, AnalysisContext, AnalysisOutcome};
use crate::queue::{RedisAnalysisQueue, HEARTBEAT_TTL_SECS};
use crate::state::AppState;

/// Seconds a claim blocks before looping; keeps the worker responsive to connection loss.
const CLAIM_TIMEOUT_SECS: u64 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(3);
/// Pause after releasing a job whose document could not be settled.
const RETRY_DELAY: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(HEARTBEAT_TTL_SECS / 3);

#[derive(Debug)]
pub enum JobOutcome {
    Analyzed(AnalysisOutcome),
    /// Nothing to do: unknown, malformed or already-terminal document.
    Skipped(String),
    /// Analysis failed and the document was marked FAILED.
    Failed(String),
    /// The document is still PROCESSING after an error; the job goes back on the queue.
    Retry(String),
}

pub fn spawn_analysis_worker(state: AppState, queue: RedisAnalysisQueue) -> JoinHandle<()> {
    tokio::spawn(heartbeat_loop(queue.clone()));
    tokio::spawn(async move { run_worker(state, queue).await })
}

async fn heartbeat_loop(queue: RedisAnalysisQueue) {
    loop {
        let mut conn = match queue.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Worker heartbeat cannot reach Redis: {e:#}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        loop {
            if let Err(e) = queue.heartbeat(&mut conn).await {
                error!("Failed to refresh heartbeat of worker {}: {e:#}", queue.worker_id());
                break;
            }
            if let Err(e) = queue.recover_abandoned(&mut conn).await {
                error!("Failed to recover abandoned analysis jobs: {e:#}");
                break;
            }
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_worker(state: AppState, queue: RedisAnalysisQueue) {
    info!("Analysis worker {} started", queue.worker_id());

    loop {
        let mut conn = match queue.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Analysis worker cannot reach Redis: {e:#}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        // Registered before the first claim, so a crash never strands an unlisted job.
        if let Err(e) = queue.heartbeat(&mut conn).await {
            error!("Analysis worker could not register: {e:#}");
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }

        if let Err(e) = drain(&state, &queue, &mut conn).await {
            error!("Analysis worker lost its Redis connection: {e:#}");
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

async fn drain(
    state: &AppState,
    queue: &RedisAnalysisQueue,
    conn: &mut MultiplexedConnection,
) -> anyhow::Result<()> {
    loop {
        let Some(job) = queue.claim(conn, CLAIM_TIMEOUT_SECS).await? else {
            continue;
        };

        match process_job(state, job.document_id).await {
            JobOutcome::Analyzed(outcome) => info!(
                "Analysis job for document {} finished: {} ({} skills)",
                outcome.document_id, outcome.status, outcome.skill_count
            ),
            JobOutcome::Skipped(reason) => warn!("Dropped analysis job '{}': {reason}", job.raw),
            JobOutcome::Failed(reason) => error!("Analysis job '{}' failed: {reason}", job.raw),
            JobOutcome::Retry(reason) => {
                warn!("Analysis job '{}' requeued: {reason}", job.raw);
                queue.release(conn, &job).await?;
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        }

        queue.ack(conn, &job).await?;
    }
}

/// Runs one queued job. Never panics; only asks for a retry while the
/// document is provably still PROCESSING or its state is unknown.
pub async fn process_job(state: &AppState, document_id: Option<Uuid>) -> JobOutcome {
    let Some(id) = document_id else {
        return JobOutcome::Skipped("payload is not a document id".to_string());
    };

    let document = match state.repo.get_document(id).await {
        Ok(Some(document)) => document,
        Ok(None) => return JobOutcome::Skipped(format!("document {id} does not exist")),
        Err(e) => return JobOutcome::Retry(format!("could not load document {id}: {e}")),
    };

    if document.status().is_terminal() {
        return JobOutcome::Skipped(format!("document {id} is already {}", document.status()));
    }

    let error = match analyze_document(&AnalysisContext::from_state(state), &document).await {
        Ok(outcome) => return JobOutcome::Analyzed(outcome),
        Err(e) => e.to_string(),
    };

    match state.repo.get_document(id).await {
        Ok(Some(document)) if document.status().is_terminal() => JobOutcome::Failed(error),
        Ok(None) => JobOutcome::Failed(error),
        Ok(Some(_)) => JobOutcome::Retry(format!("document {id} is still PROCESSING: {error}")),
        Err(e) => JobOutcome::Retry(format!("{error}; status unknown: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::DocumentStatus;
    use crate::testing::{FailurePoint, Harness};

    #[tokio::test]
    async fn test_queued_document_is_analyzed() {
        let harness = Harness::new();
        harness
            .llm
            .push_reply(r#"[{"skillName": "Rust", "category": "Programming", "skillType": "technical"}]"#);
        let document = harness.seed_document("notes.txt", "Rust").await;

        let outcome = process_job(&harness.state, Some(document.id)).await;

        match outcome {
            JobOutcome::Analyzed(result) => {
                assert_eq!(result.status, DocumentStatus::Completed);
                assert_eq!(result.skill_count, 1);
            }
            other => panic!("expected analysis, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redelivered_job_for_terminal_document_is_skipped() {
        let harness = Harness::new();
        harness.llm.push_reply("[]");
        let document = harness.seed_document("notes.txt", "Rust").await;

        process_job(&harness.state, Some(document.id)).await;
        let second = process_job(&harness.state, Some(document.id)).await;

        assert!(matches!(second, JobOutcome::Skipped(_)));
        assert_eq!(harness.llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_jobs_are_skipped() {
        let harness = Harness::new();
        assert!(matches!(process_job(&harness.state, None).await, JobOutcome::Skipped(_)));
        assert!(matches!(
            process_job(&harness.state, Some(Uuid::new_v4())).await,
            JobOutcome::Skipped(_)
        ));
        assert_eq!(harness.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported_and_document_failed() {
        let harness = Harness::new();
        harness.llm.push_failure();
        let document = harness.seed_document("notes.txt", "Rust").await;

        let outcome = process_job(&harness.state, Some(document.id)).await;

        assert!(matches!(outcome, JobOutcome::Failed(_)));
        assert_eq!(
            harness.repo.document(document.id).unwrap().status(),
            DocumentStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unreadable_document_is_retried_without_model_call() {
        let harness = Harness::new();
        let document = harness.seed_document("notes.txt", "Rust").await;
        harness.repo.fail_on(FailurePoint::GetDocument);

        let outcome = process_job(&harness.state, Some(document.id)).await;

        assert!(matches!(outcome, JobOutcome::Retry(_)));
        assert_eq!(harness.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_marks_document_failed_and_acks() {
        let harness = Harness::new();
        harness.llm.push_reply(r#"[{"skillName": "Rust"}]"#);
        let document = harness.seed_document("notes.txt", "Rust").await;
        harness.repo.fail_on(FailurePoint::CompleteDocument);

        let outcome = process_job(&harness.state, Some(document.id)).await;

        assert!(matches!(outcome, JobOutcome::Failed(_)));
        assert_eq!(
            harness.repo.document(document.id).unwrap().status(),
            DocumentStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_document_left_processing_is_retried() {
        let harness = Harness::new();
        harness.llm.push_reply(r#"[{"skillName": "Rust"}]"#);
        let document = harness.seed_document("notes.txt", "Rust").await;
        harness.repo.fail_on(FailurePoint::CompleteDocument);
        harness.repo.fail_on(FailurePoint::FailDocument);

        let outcome = process_job(&harness.state, Some(document.id)).await;

        assert!(matches!(outcome, JobOutcome::Retry(_)));
        assert_eq!(
            harness.repo.document(document.id).unwrap().status(),
            DocumentStatus::Processing
        );
    }
}
