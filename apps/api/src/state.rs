use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::llm_client::Gateway;
use crate::profile::github::GithubClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The only path to the AI provider. Owns the credential pool.
    pub gateway: Arc<Gateway>,
    pub github: GithubClient,
    /// Cancelled on process shutdown; handlers hand child tokens to the gateway.
    pub shutdown: CancellationToken,
}
