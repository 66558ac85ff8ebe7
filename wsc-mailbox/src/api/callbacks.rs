//! Callback mailbox endpoints
//!
//! One handler pair serves every callback kind:
//! - `POST /api/<kind>-callback`: the workflow engine deposits its result
//! - `GET /api/<kind>-callback?session_id=...`: the wizard polls for it
//!
//! Absence on GET is the steady state while the workflow runs, so it is a
//! `200 { success: false, data: null }` and never an error.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wsc_common::{CallbackKind, Envelope, SessionId};

use crate::error::{ApiError, ApiResult};
use crate::store::{MailboxEntry, MailboxKey};
use crate::AppState;

/// Marker telling the poller to stop
pub const FINAL_MARKER: &str = "final";

/// GET query parameters
#[derive(Debug, Deserialize)]
pub struct RetrievalQuery {
    pub session_id: Option<String>,
}

/// POST acknowledgement
#[derive(Debug, Serialize)]
pub struct SubmissionAck {
    pub success: bool,
    pub received: bool,
}

/// GET response
#[derive(Debug, Serialize)]
pub struct RetrievalResponse {
    pub success: bool,
    pub data: Option<Envelope>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub marker: Option<&'static str>,
}

impl RetrievalResponse {
    fn delivered(envelope: Envelope) -> Self {
        Self {
            success: true,
            data: Some(envelope),
            marker: Some(FINAL_MARKER),
        }
    }

    fn pending() -> Self {
        Self {
            success: false,
            data: None,
            marker: None,
        }
    }
}

fn missing_session_id() -> ApiError {
    ApiError::Validation("session_id is required".to_string())
}

/// POST handler shared by all kinds
pub async fn submit_callback(
    kind: CallbackKind,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<SubmissionAck>> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Internal(format!("Failed to parse {} callback body: {}", kind, e)))?;

    let Value::Object(body) = value else {
        return Err(missing_session_id());
    };

    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .and_then(|raw| SessionId::parse(raw).ok())
        .ok_or_else(missing_session_id)?;

    let received_at = wsc_common::time::now();
    let envelope = Envelope::normalize(kind, &body, received_at);
    let entry = MailboxEntry::new(envelope, received_at, state.entry_ttl);

    let outcome = state
        .store
        .put(MailboxKey::new(kind, session_id.clone()), entry)
        .await?;

    if outcome.replaced {
        tracing::warn!(
            kind = %kind,
            session_id = %session_id,
            "Callback overwrote an undelivered result for the same session"
        );
    } else {
        tracing::info!(kind = %kind, session_id = %session_id, "Callback deposited");
    }

    Ok(Json(SubmissionAck {
        success: true,
        received: true,
    }))
}

/// GET handler shared by all kinds
pub async fn retrieve_callback(
    kind: CallbackKind,
    State(state): State<AppState>,
    query: Result<Query<RetrievalQuery>, QueryRejection>,
) -> ApiResult<Json<RetrievalResponse>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(format!("Invalid query string: {}", e)))?;

    let session_id = query
        .session_id
        .as_deref()
        .and_then(|raw| SessionId::parse(raw).ok())
        .ok_or_else(missing_session_id)?;

    let key = MailboxKey::new(kind, session_id);
    match state.store.take(&key, wsc_common::time::now()).await? {
        Some(entry) => {
            tracing::info!(
                kind = %kind,
                session_id = %key.session_id,
                waited_ms = (wsc_common::time::now() - entry.received_at).num_milliseconds(),
                "Callback delivered"
            );
            Ok(Json(RetrievalResponse::delivered(entry.envelope)))
        }
        None => {
            tracing::debug!(kind = %kind, session_id = %key.session_id, "Callback not ready");
            Ok(Json(RetrievalResponse::pending()))
        }
    }
}

/// Build the POST/GET route for every callback kind
pub fn callback_routes() -> Router<AppState> {
    CallbackKind::ALL.into_iter().fold(Router::new(), |router, kind| {
        router.route(
            kind.route_path(),
            get(move |state: State<AppState>, query: Result<Query<RetrievalQuery>, QueryRejection>| {
                retrieve_callback(kind, state, query)
            })
            .post(move |state: State<AppState>, body: Bytes| submit_callback(kind, state, body)),
        )
    })
}
