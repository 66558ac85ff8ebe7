//! One AI-assisted wizard step: trigger a workflow, then wait for its result

use serde_json::{Map, Value};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;
use wsc_common::{CallbackKind, Envelope, SessionId};

use crate::error::{ClientError, ClientResult};
use crate::poller::{PollOutcome, PollState, Poller};
use crate::trigger::{TriggerOutcome, WorkflowTrigger};

/// What the wizard should render after a copilot request
#[derive(Debug, Clone, PartialEq)]
pub enum CopilotOutcome {
    /// Workflow result delivered
    Ai {
        session_id: SessionId,
        envelope: Envelope,
    },
    /// Workflow never started; use the non-AI path
    Fallback { reason: String },
    /// Workflow started but its result did not arrive; the user may retry the poll
    TimedOut { session_id: SessionId, attempts: u32 },
    Errored { session_id: SessionId, reason: String },
    Cancelled { session_id: SessionId },
}

impl CopilotOutcome {
    fn from_poll(session_id: SessionId, outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Resolved { envelope, .. } => CopilotOutcome::Ai {
                session_id,
                envelope,
            },
            PollOutcome::TimedOut { attempts } => CopilotOutcome::TimedOut {
                session_id,
                attempts,
            },
            PollOutcome::Errored { error, .. } => CopilotOutcome::Errored {
                session_id,
                reason: error,
            },
            PollOutcome::Cancelled { .. } => CopilotOutcome::Cancelled { session_id },
        }
    }
}

/// Trigger + poller, allowing one request in flight at a time
pub struct Copilot {
    trigger: WorkflowTrigger,
    poller: Poller,
    in_flight: Mutex<()>,
}

impl Copilot {
    pub fn new(trigger: WorkflowTrigger, poller: Poller) -> Self {
        Self {
            trigger,
            poller,
            in_flight: Mutex::new(()),
        }
    }

    /// Follow the poller's state (drives the "processing" indicator)
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.poller.subscribe()
    }

    /// Run one workflow under a fresh session id
    ///
    /// Returns [`ClientError::Busy`] while another request or retry is in flight.
    pub async fn request(
        &self,
        kind: CallbackKind,
        context: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> ClientResult<CopilotOutcome> {
        let _guard = self.in_flight.try_lock().map_err(|_| ClientError::Busy)?;

        let session_id = SessionId::generate();
        info!(kind = %kind, session_id = %session_id, "Copilot request");

        match self.trigger.start(kind, &session_id, context).await {
            TriggerOutcome::Started => {}
            TriggerOutcome::Degraded(reason) => return Ok(CopilotOutcome::Fallback { reason }),
        }

        let outcome = self.poller.poll(kind, &session_id, cancel).await;
        Ok(CopilotOutcome::from_poll(session_id, outcome))
    }

    /// Poll again for a session whose earlier poll timed out or errored
    pub async fn retry_poll(
        &self,
        kind: CallbackKind,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> ClientResult<CopilotOutcome> {
        let _guard = self.in_flight.try_lock().map_err(|_| ClientError::Busy)?;

        info!(kind = %kind, session_id = %session_id, "Retrying poll");
        let outcome = self.poller.poll(kind, session_id, cancel).await;
        Ok(CopilotOutcome::from_poll(session_id.clone(), outcome))
    }
}
