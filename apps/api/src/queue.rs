//! Durable hand-off of document analysis jobs.
//!
//! Jobs are document ids on a shared Redis list. Each worker claims a job by
//! moving it atomically onto its own processing list and acknowledges it by
//! removing it from there once analysis has finished. A worker keeps a
//! heartbeat key alive while it runs; the processing list of a worker whose
//! heartbeat has expired is requeued by any live worker.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub const PENDING_KEY: &str = "skillsync:analysis:pending";
/// Set of worker ids that may own a processing list.
pub const WORKERS_KEY: &str = "skillsync:analysis:workers";
const PROCESSING_PREFIX: &str = "skillsync:analysis:processing";
const HEARTBEAT_PREFIX: &str = "skillsync:analysis:heartbeat";

/// A worker silent for longer than this is considered dead.
pub const HEARTBEAT_TTL_SECS: u64 = 30;

pub fn processing_key(worker_id: &str) -> String {
    format!("{PROCESSING_PREFIX}:{worker_id}")
}

pub fn heartbeat_key(worker_id: &str) -> String {
    format!("{HEARTBEAT_PREFIX}:{worker_id}")
}

#[async_trait]
pub trait AnalysisQueue: Send + Sync {
    async fn enqueue(&self, document_id: Uuid) -> Result<(), AppError>;
}

/// A job taken off the pending list. `raw` is the exact list value, needed to ack it.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub raw: String,
    pub document_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct RedisAnalysisQueue {
    client: redis::Client,
    worker_id: String,
}

impl RedisAnalysisQueue {
    /// Every instance gets a fresh worker id, so a restart never adopts the
    /// processing list of its previous run; that list is recovered once its
    /// heartbeat lapses.
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            worker_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }

    /// Registers this worker and extends its heartbeat by `HEARTBEAT_TTL_SECS`.
    pub async fn heartbeat(&self, conn: &mut MultiplexedConnection) -> Result<()> {
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(heartbeat_key(&self.worker_id))
            .arg(1)
            .arg("EX")
            .arg(HEARTBEAT_TTL_SECS)
            .ignore()
            .cmd("SADD")
            .arg(WORKERS_KEY)
            .arg(&self.worker_id)
            .ignore()
            .query_async::<_, ()>(conn)
            .await
            .context("Failed to refresh worker heartbeat")
    }

    /// Moves the in-flight jobs of every worker whose heartbeat has expired
    /// back to pending. Jobs of live workers are left alone.
    pub async fn recover_abandoned(&self, conn: &mut MultiplexedConnection) -> Result<usize> {
        let workers: Vec<String> = redis::cmd("SMEMBERS")
            .arg(WORKERS_KEY)
            .query_async(conn)
            .await
            .context("Failed to list analysis workers")?;

        let mut recovered = 0;
        for worker in workers {
            if worker == self.worker_id {
                continue;
            }
            let alive: bool = redis::cmd("EXISTS")
                .arg(heartbeat_key(&worker))
                .query_async(conn)
                .await
                .context("Failed to read worker heartbeat")?;
            if alive {
                continue;
            }

            let moved = requeue_all(conn, &processing_key(&worker)).await?;
            redis::cmd("SREM")
                .arg(WORKERS_KEY)
                .arg(&worker)
                .query_async::<_, ()>(conn)
                .await
                .context("Failed to deregister dead worker")?;
            if moved > 0 {
                info!("Requeued {moved} analysis jobs abandoned by worker {worker}");
            }
            recovered += moved;
        }
        Ok(recovered)
    }

    /// Blocks up to `timeout_secs` waiting for the next job.
    pub async fn claim(
        &self,
        conn: &mut MultiplexedConnection,
        timeout_secs: u64,
    ) -> Result<Option<ClaimedJob>> {
        let raw: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(PENDING_KEY)
            .arg(processing_key(&self.worker_id))
            .arg(timeout_secs)
            .query_async(conn)
            .await
            .context("Failed to claim analysis job")?;

        Ok(raw.map(|raw| ClaimedJob {
            document_id: Uuid::parse_str(raw.trim()).ok(),
            raw,
        }))
    }

    pub async fn ack(&self, conn: &mut MultiplexedConnection, job: &ClaimedJob) -> Result<()> {
        redis::cmd("LREM")
            .arg(processing_key(&self.worker_id))
            .arg(1)
            .arg(&job.raw)
            .query_async::<_, ()>(conn)
            .await
            .context("Failed to acknowledge analysis job")
    }

    /// Puts a claimed job back at the end of the pending list.
    pub async fn release(&self, conn: &mut MultiplexedConnection, job: &ClaimedJob) -> Result<()> {
        redis::pipe()
            .atomic()
            .cmd("LREM")
            .arg(processing_key(&self.worker_id))
            .arg(1)
            .arg(&job.raw)
            .ignore()
            .cmd("LPUSH")
            .arg(PENDING_KEY)
            .arg(&job.raw)
            .ignore()
            .query_async::<_, ()>(conn)
            .await
            .context("Failed to release analysis job")
    }
}

async fn requeue_all(conn: &mut MultiplexedConnection, processing: &str) -> Result<usize> {
    let mut moved = 0;
    loop {
        let job: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(processing)
            .arg(PENDING_KEY)
            .query_async(conn)
            .await
            .context("Failed to requeue abandoned analysis job")?;
        match job {
            Some(_) => moved += 1,
            None => return Ok(moved),
        }
    }
}

#[async_trait]
impl AnalysisQueue for RedisAnalysisQueue {
    async fn enqueue(&self, document_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        redis::cmd("LPUSH")
            .arg(PENDING_KEY)
            .arg(document_id.to_string())
            .query_async::<_, ()>(&mut conn)
            .await
            .context("Failed to enqueue analysis job")?;
        Ok(())
    }
}
