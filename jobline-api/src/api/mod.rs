//! API Module
//!
//! HTTP API layer for job submission and status lookups.

pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/enqueue", post(job::enqueue_job))
        .route("/status", get(job::missing_job_id))
        .route("/status/", get(job::missing_job_id))
        .route("/status/{id}", get(job::get_job_status))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
