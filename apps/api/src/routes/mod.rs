pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::profile::handlers::handle_scan_profile;
use crate::resume::handlers::handle_scan_resume;
use crate::roadmap::handlers::handle_generate_roadmap;
use crate::state::AppState;
use crate::vision::handlers::handle_critique_profile;

/// Cap on any request body, uploads included.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/roadmap", post(handle_generate_roadmap))
        .route("/api/github", post(handle_scan_profile))
        .route("/api/linkedin", post(handle_critique_profile))
        .route("/api/ats", post(handle_scan_resume))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
