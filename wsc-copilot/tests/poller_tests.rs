//! Poller timing and termination tests
//!
//! A scripted retrieval client stands in for the mailbox; the tokio clock is
//! paused so interval spacing can be asserted exactly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wsc_common::{CallbackKind, Envelope, SessionId};
use wsc_copilot::{ClientError, ClientResult, PollOutcome, PollPolicy, PollState, Poller, Retrieval, RetrievalClient};

#[derive(Clone, Copy)]
enum Step {
    Pending,
    Ready,
    Fail,
}

/// Replays a script of answers; pending once the script runs out
struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedClient {
    fn new(script: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalClient for ScriptedClient {
    async fn fetch(&self, kind: CallbackKind, _session_id: &SessionId) -> ClientResult<Retrieval> {
        self.calls.lock().unwrap().push(Instant::now());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Pending);
        match step {
            Step::Pending => Ok(Retrieval::Pending),
            Step::Ready => Ok(Retrieval::Ready(sample_envelope(kind))),
            Step::Fail => Err(ClientError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        }
    }
}

fn sample_envelope(kind: CallbackKind) -> Envelope {
    let body = json!({"generated_content": "Hello"});
    Envelope::normalize(kind, body.as_object().unwrap(), wsc_common::time::now())
}

fn policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1500),
        max_attempts,
        max_transport_errors: 3,
    }
}

fn session() -> SessionId {
    SessionId::parse("1700000000000-k3j9x0a1b").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_resolves_on_third_attempt() {
    let client = ScriptedClient::new([Step::Pending, Step::Pending, Step::Ready]);
    let poller = Poller::new(client.clone(), policy(30));

    let outcome = poller
        .poll(CallbackKind::Generation, &session(), &CancellationToken::new())
        .await;

    let PollOutcome::Resolved { envelope, attempts } = outcome else {
        panic!("expected resolution, got {:?}", outcome);
    };
    assert_eq!(attempts, 3);
    assert_eq!(envelope.kind(), CallbackKind::Generation);
    assert_eq!(client.call_times().len(), 3);
    assert_eq!(poller.state(), PollState::Resolved);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_exactly_max_attempts() {
    let client = ScriptedClient::new([]);
    let poller = Poller::new(client.clone(), policy(30));
    let started = Instant::now();
    assert_eq!(poller.policy().ceiling(), Duration::from_millis(1500 * 29));

    let outcome = poller
        .poll(CallbackKind::Example, &session(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 30 });
    let calls = client.call_times();
    assert_eq!(calls.len(), 30);
    for pair in calls.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_millis(1500));
    }
    // No trailing sleep after the last attempt
    assert_eq!(Instant::now() - started, poller.policy().ceiling());
    assert_eq!(poller.state(), PollState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_budget_makes_one_call() {
    let client = ScriptedClient::new([]);
    let poller = Poller::new(client.clone(), policy(1));

    let outcome = poller
        .poll(CallbackKind::Content, &session(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 1 });
    assert_eq!(client.call_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_transport_errors_end_polling() {
    let client = ScriptedClient::new([Step::Pending, Step::Fail, Step::Fail, Step::Fail, Step::Ready]);
    let poller = Poller::new(client.clone(), policy(30));

    let outcome = poller
        .poll(CallbackKind::Assistant, &session(), &CancellationToken::new())
        .await;

    let PollOutcome::Errored { attempts, error } = outcome else {
        panic!("expected errored outcome, got {:?}", outcome);
    };
    assert_eq!(attempts, 4);
    assert!(error.contains("502"));
    assert_eq!(client.call_times().len(), 4);
    assert_eq!(poller.state(), PollState::Errored);
}

#[tokio::test(start_paused = true)]
async fn test_successful_response_resets_error_count() {
    let client = ScriptedClient::new([
        Step::Fail,
        Step::Fail,
        Step::Pending,
        Step::Fail,
        Step::Fail,
        Step::Ready,
    ]);
    let poller = Poller::new(client.clone(), policy(30));

    let outcome = poller
        .poll(CallbackKind::Generation, &session(), &CancellationToken::new())
        .await;

    assert!(matches!(outcome, PollOutcome::Resolved { attempts: 6, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_count_toward_attempt_budget() {
    let client = ScriptedClient::new([Step::Fail, Step::Pending, Step::Fail]);
    let poller = Poller::new(client.clone(), policy(3));

    let outcome = poller
        .poll(CallbackKind::Generation, &session(), &CancellationToken::new())
        .await;

    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_sleep_stops_further_calls() {
    let client = ScriptedClient::new([]);
    let poller = Arc::new(Poller::new(client.clone(), policy(30)));
    let cancel = CancellationToken::new();

    let task = {
        let poller = poller.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.poll(CallbackKind::Content, &session(), &cancel).await })
    };

    // Two calls happen at t=0 and t=1.5s; cancel midway through the second sleep
    tokio::time::sleep(Duration::from_millis(2000)).await;
    cancel.cancel();

    let outcome = task.await.unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled { attempts: 2 });
    assert_eq!(client.call_times().len(), 2);
    assert_eq!(poller.state(), PollState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_makes_no_calls() {
    let client = ScriptedClient::new([Step::Ready]);
    let poller = Poller::new(client.clone(), policy(30));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = poller.poll(CallbackKind::Content, &session(), &cancel).await;

    assert_eq!(outcome, PollOutcome::Cancelled { attempts: 0 });
    assert!(client.call_times().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions_are_published() {
    let client = ScriptedClient::new([Step::Pending, Step::Ready]);
    let poller = Poller::new(client, policy(30));
    let mut states = poller.subscribe();
    assert_eq!(*states.borrow(), PollState::Idle);

    let outcome = poller
        .poll(CallbackKind::Generation, &session(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.attempts(), 2);

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), PollState::Resolved);
    assert!(states.borrow().is_terminal());
}
