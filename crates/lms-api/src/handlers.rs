//! API request handlers.

pub mod categories;
pub mod courses;
pub mod payments;
pub mod progress;
pub mod reviews;
pub mod sections;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "lms-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check: verifies the store is reachable via a cheap read.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.categories.list_all().await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ready"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not ready", "reason": e.to_string()})),
        ),
    }
}
