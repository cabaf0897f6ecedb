//! Health Check API Handler
//!
//! Liveness endpoint. It does not probe the store or the queue.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
