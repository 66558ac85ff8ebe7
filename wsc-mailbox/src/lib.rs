//! wsc-mailbox library - callback mailbox service
//!
//! Bridges the wizard's polling requests to the asynchronous workflow engine:
//! the engine POSTs each result into a session-keyed mailbox, the wizard GETs
//! it exactly once.

pub mod api;
pub mod config;
pub mod error;
pub mod store;
pub mod sweeper;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::store::MailboxStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Mailbox backend; the only shared mutable resource
    pub store: Arc<dyn MailboxStore>,
    /// Lifetime given to each deposited entry
    pub entry_ttl: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<dyn MailboxStore>, entry_ttl: Duration) -> Self {
        Self {
            store,
            entry_ttl,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::callback_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
