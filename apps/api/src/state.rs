use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::Config;
use crate::llm_client::CompletionBackend;
use crate::queue::AnalysisQueue;
use crate::repository::Repository;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub llm: Arc<dyn CompletionBackend>,
    pub storage: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Background analysis hand-off. Redis-backed in production.
    pub queue: Arc<dyn AnalysisQueue>,
    pub config: Config,
}
