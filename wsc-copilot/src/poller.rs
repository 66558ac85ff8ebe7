//! Bounded, cancellable polling of a callback mailbox
//!
//! Turns "the server only answers point-in-time reads" into one awaited
//! result. Every retrieval call counts as an attempt. The loop ends on the
//! first delivered envelope, when the attempt budget is spent, when transport
//! errors pile up past their own budget, or when the caller cancels.
//!
//! State transitions are published on a `watch` channel so a UI can show a
//! "processing" indicator and refuse duplicate submissions:
//!
//! ```text
//! Idle -> Polling { attempt } -> Resolved | TimedOut | Errored | Cancelled
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wsc_common::{CallbackKind, Envelope, SessionId};

use crate::retrieval::{Retrieval, RetrievalClient};

/// Poll pacing and budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between attempts
    pub interval: Duration,
    /// Total retrieval calls before giving up
    pub max_attempts: u32,
    /// Consecutive transport failures tolerated before giving up
    pub max_transport_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_attempts: 30,
            max_transport_errors: 3,
        }
    }
}

impl PollPolicy {
    /// Longest time a poll can take, ignoring request latency
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Observable poller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling { attempt: u32 },
    Resolved,
    TimedOut,
    Errored,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Idle | PollState::Polling { .. })
    }
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Resolved { envelope: Envelope, attempts: u32 },
    TimedOut { attempts: u32 },
    Errored { attempts: u32, error: String },
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Resolved { attempts, .. }
            | PollOutcome::TimedOut { attempts }
            | PollOutcome::Errored { attempts, .. }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }

    fn state(&self) -> PollState {
        match self {
            PollOutcome::Resolved { .. } => PollState::Resolved,
            PollOutcome::TimedOut { .. } => PollState::TimedOut,
            PollOutcome::Errored { .. } => PollState::Errored,
            PollOutcome::Cancelled { .. } => PollState::Cancelled,
        }
    }
}

pub struct Poller {
    client: Arc<dyn RetrievalClient>,
    policy: PollPolicy,
    state: watch::Sender<PollState>,
}

impl Poller {
    pub fn new(client: Arc<dyn RetrievalClient>, policy: PollPolicy) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            client,
            policy,
            state,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Follow state transitions of this poller
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Poll until the mailbox for `(kind, session_id)` delivers or a budget runs out
    pub async fn poll(
        &self,
        kind: CallbackKind,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let outcome = self.run(kind, session_id, cancel).await;
        self.state.send_replace(outcome.state());

        match &outcome {
            PollOutcome::Resolved { attempts, .. } => {
                info!(kind = %kind, session_id = %session_id, attempts, "Workflow result received")
            }
            PollOutcome::TimedOut { attempts } => warn!(
                kind = %kind,
                session_id = %session_id,
                attempts,
                "Workflow result did not arrive in time"
            ),
            PollOutcome::Errored { attempts, error } => warn!(
                kind = %kind,
                session_id = %session_id,
                attempts,
                error = %error,
                "Polling abandoned after repeated transport errors"
            ),
            PollOutcome::Cancelled { attempts } => {
                info!(kind = %kind, session_id = %session_id, attempts, "Polling cancelled")
            }
        }

        outcome
    }

    async fn run(
        &self,
        kind: CallbackKind,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let max_transport_errors = self.policy.max_transport_errors.max(1);
        let mut attempts = 0;
        let mut consecutive_errors = 0;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            self.state.send_replace(PollState::Polling { attempt: attempts });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                result = self.client.fetch(kind, session_id) => result,
            };

            match result {
                Ok(Retrieval::Ready(envelope)) => {
                    return PollOutcome::Resolved { envelope, attempts };
                }
                Ok(Retrieval::Pending) => {
                    consecutive_errors = 0;
                    debug!(kind = %kind, session_id = %session_id, attempt = attempts, "Result not ready");
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        kind = %kind,
                        session_id = %session_id,
                        attempt = attempts,
                        consecutive_errors,
                        error = %e,
                        "Poll attempt failed"
                    );
                    if consecutive_errors >= max_transport_errors {
                        return PollOutcome::Errored {
                            attempts,
                            error: e.to_string(),
                        };
                    }
                }
            }

            if attempts >= max_attempts {
                return PollOutcome::TimedOut { attempts };
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }
}
