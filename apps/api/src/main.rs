mod config;
mod errors;
mod extractors;
mod llm_client;
mod profile;
mod resume;
mod roadmap;
mod routes;
mod state;
mod vision;

use anyhow::Result;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::gemini::GeminiProvider;
use crate::llm_client::pool::CredentialPool;
use crate::llm_client::Gateway;
use crate::profile::github::GithubClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing credentials)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize AI gateway
    let pool = CredentialPool::new(config.gemini_api_keys.iter().map(String::as_str))?;
    info!("Credential pool initialized ({} keys)", pool.len());

    let provider = GeminiProvider::new(config.gemini_api_base.clone(), config.call_timeout)?;
    let gateway = Gateway::new(Arc::new(provider), pool, config.retry_policy());
    info!(
        "AI gateway initialized (model: {}, max attempts: {})",
        llm_client::gemini::MODEL,
        config.max_attempts
    );

    // Initialize GitHub client
    let github = GithubClient::new(config.github_api_base.clone(), config.github_token.clone())?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));

    // Build app state
    let state = AppState {
        gateway: Arc::new(gateway),
        github,
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Cancels in-flight AI requests (including their backoff sleeps) on Ctrl-C.
async fn watch_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
