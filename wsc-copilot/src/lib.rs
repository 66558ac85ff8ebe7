//! wsc-copilot library - client side of the callback mailbox
//!
//! Starts workflows on the external engine and waits for their results by
//! polling the mailbox service.

pub mod config;
pub mod copilot;
pub mod error;
pub mod poller;
pub mod retrieval;
pub mod trigger;

pub use crate::copilot::{Copilot, CopilotOutcome};
pub use crate::error::{ClientError, ClientResult};
pub use crate::poller::{PollOutcome, PollPolicy, PollState, Poller};
pub use crate::retrieval::{HttpRetrievalClient, Retrieval, RetrievalClient};
pub use crate::trigger::{TriggerOutcome, WorkflowTrigger};

use std::sync::Arc;

use crate::config::Config;

/// Wire a copilot against the HTTP mailbox and webhooks in `config`
pub fn build_copilot(config: &Config) -> ClientResult<Copilot> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let retrieval = HttpRetrievalClient::with_client(http.clone(), config.mailbox_url.clone());
    let poller = Poller::new(Arc::new(retrieval), config.poll);
    let trigger = WorkflowTrigger::new(http, config.webhooks.clone(), config.callback_base_url.clone());

    Ok(Copilot::new(trigger, poller))
}
