//! Error types for wsc-mailbox
//!
//! Validation and internal failures are recovered at the handler boundary and
//! turned into `{ "error": "..." }` bodies. They never escape to the workflow
//! engine as a dropped connection.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unusable request identifier (400)
    #[error("{0}")]
    Validation(String),

    /// Malformed body or unexpected failure while handling it (500)
    #[error("{0}")]
    Internal(String),

    /// Mailbox backend failure (500)
    #[error("Mailbox store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Callback request failed");
        } else {
            tracing::debug!(error = %self, "Callback request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::Validation("session_id is required".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "session_id is required");
    }

    #[test]
    fn test_store_maps_to_server_error() {
        let err = ApiError::from(StoreError::Corrupt("bad row".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
