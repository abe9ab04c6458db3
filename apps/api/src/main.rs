mod auth;
mod config;
mod courses;
mod db;
mod documents;
mod errors;
mod guidance;
mod llm_client;
mod matching;
mod models;
mod profile;
mod queue;
mod repository;
mod routes;
mod skills;
mod state;
mod storage;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::HostedIdentity;
use crate::config::Config;
use crate::db::create_pool;
use crate::documents::worker::spawn_analysis_worker;
use crate::llm_client::LlmClient;
use crate::queue::RedisAnalysisQueue;
use crate::repository::PgRepository;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillSync API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (migrations applied on connect)
    let pool = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgRepository::new(pool));

    // Redis analysis queue
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = RedisAnalysisQueue::new(redis);
    info!("Redis client initialized");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage = Arc::new(S3ObjectStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    ));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.llm_timeout_secs
    );

    let identity = HostedIdentity::new(config.identity_url.clone(), config.identity_api_key.clone());

    let state = AppState {
        repo,
        llm: Arc::new(llm),
        storage,
        identity: Arc::new(identity),
        queue: Arc::new(queue.clone()),
        config: config.clone(),
    };

    if config.analysis_worker_enabled {
        spawn_analysis_worker(state.clone(), queue);
    } else {
        info!("Analysis worker disabled; documents are analyzed on request only");
    }

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
