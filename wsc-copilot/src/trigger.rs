//! Starting workflows on the external engine
//!
//! A job request is the caller's context object with three routing fields
//! added: the session id, the callback URL the workflow must POST its result
//! to, and the kind. The engine acknowledges with a short JSON body; anything
//! that is not a recognizable acknowledgement degrades to the caller's
//! non-AI path instead of failing.

use serde_json::{Map, Value};
use tracing::{info, warn};
use wsc_common::{CallbackKind, SessionId};

use crate::config::WebhooksSection;

/// Substring of n8n's default acknowledgement message
const STARTED_MARKER: &str = "workflow was started";

/// Result of asking the engine to start a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Engine accepted the job; a callback is expected
    Started,
    /// Engine unreachable or unrecognized reply; no callback should be awaited
    Degraded(String),
}

pub struct WorkflowTrigger {
    http: reqwest::Client,
    webhooks: WebhooksSection,
    callback_base_url: String,
}

impl WorkflowTrigger {
    pub fn new(
        http: reqwest::Client,
        webhooks: WebhooksSection,
        callback_base_url: impl Into<String>,
    ) -> Self {
        let callback_base_url = callback_base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            webhooks,
            callback_base_url,
        }
    }

    /// URL the workflow posts its result to for `kind`
    pub fn callback_url(&self, kind: CallbackKind) -> String {
        format!("{}{}", self.callback_base_url, kind.route_path())
    }

    /// Build the job payload sent to the webhook
    ///
    /// Routing fields overwrite same-named context fields.
    pub fn job_request(
        &self,
        kind: CallbackKind,
        session_id: &SessionId,
        context: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut job = context.clone();
        job.insert("session_id".to_string(), Value::String(session_id.to_string()));
        job.insert("callback_url".to_string(), Value::String(self.callback_url(kind)));
        job.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
        job
    }

    /// POST a job request for `kind` and classify the engine's reply
    pub async fn start(
        &self,
        kind: CallbackKind,
        session_id: &SessionId,
        context: &Map<String, Value>,
    ) -> TriggerOutcome {
        let Some(webhook) = self.webhooks.url_for(kind) else {
            return degraded(kind, session_id, format!("no webhook configured for {}", kind));
        };

        let job = self.job_request(kind, session_id, context);

        let response = match self.http.post(webhook).json(&job).send().await {
            Ok(response) => response,
            Err(e) => {
                return degraded(kind, session_id, format!("webhook unreachable: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return degraded(kind, session_id, format!("webhook returned HTTP {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return degraded(kind, session_id, format!("webhook reply was not JSON: {}", e));
            }
        };

        if is_acknowledgement(&body) {
            info!(kind = %kind, session_id = %session_id, "Workflow started");
            TriggerOutcome::Started
        } else {
            degraded(kind, session_id, format!("unrecognized webhook reply: {}", body))
        }
    }
}

fn degraded(kind: CallbackKind, session_id: &SessionId, reason: String) -> TriggerOutcome {
    warn!(kind = %kind, session_id = %session_id, reason = %reason, "Workflow not started, using fallback");
    TriggerOutcome::Degraded(reason)
}

/// n8n answers `{"message": "Workflow was started"}`; custom flows may answer `{"success": true}`
fn is_acknowledgement(body: &Value) -> bool {
    let started = body
        .get("message")
        .and_then(Value::as_str)
        .map(|m| m.to_lowercase().contains(STARTED_MARKER))
        .unwrap_or(false);
    let success = body.get("success").and_then(Value::as_bool) == Some(true);
    started || success
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trigger() -> WorkflowTrigger {
        WorkflowTrigger::new(
            reqwest::Client::new(),
            WebhooksSection::default(),
            "https://public.example.com/",
        )
    }

    #[test]
    fn test_job_request_carries_routing_fields() {
        let session = SessionId::parse("1700000000000-abcdefghi").unwrap();
        let context = json!({"topic": "hiring", "kind": "spoofed"});
        let job = trigger().job_request(CallbackKind::Generation, &session, context.as_object().unwrap());

        assert_eq!(job["topic"], "hiring");
        assert_eq!(job["session_id"], "1700000000000-abcdefghi");
        assert_eq!(
            job["callback_url"],
            "https://public.example.com/api/generation-callback"
        );
        assert_eq!(job["kind"], "generation");
    }

    #[test]
    fn test_acknowledgement_shapes() {
        assert!(is_acknowledgement(&json!({"message": "Workflow was started"})));
        assert!(is_acknowledgement(&json!({"message": "workflow was started successfully"})));
        assert!(is_acknowledgement(&json!({"success": true})));
        assert!(!is_acknowledgement(&json!({"success": false})));
        assert!(!is_acknowledgement(&json!({"message": "Error in workflow"})));
        assert!(!is_acknowledgement(&json!(["Workflow was started"])));
    }

    #[tokio::test]
    async fn test_missing_webhook_degrades() {
        let session = SessionId::generate();
        let outcome = trigger()
            .start(CallbackKind::Example, &session, &Map::new())
            .await;
        assert!(matches!(outcome, TriggerOutcome::Degraded(reason) if reason.contains("no webhook")));
    }
}
