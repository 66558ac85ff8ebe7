//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the store cannot be read
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub uptime_seconds: u64,
    /// Store backend in use ("memory" or "sqlite")
    pub backend: String,
    /// Entries waiting to be polled; absent when the store is unreadable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_entries: Option<usize>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    let pending_entries = match state.store.len().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read mailbox size");
            None
        }
    };

    Json(HealthResponse {
        status: if pending_entries.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "wsc-mailbox".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        backend: state.store.backend_name().to_string(),
        pending_entries,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
