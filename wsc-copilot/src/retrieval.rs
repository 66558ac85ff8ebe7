//! Point-in-time reads of a callback mailbox
//!
//! The poller only needs one question answered per attempt: is the result
//! there yet? [`RetrievalClient`] is that seam; [`HttpRetrievalClient`] asks
//! the mailbox service over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use wsc_common::{CallbackKind, Envelope, SessionId};

use crate::error::{ClientError, ClientResult};

/// Answer to a single retrieval attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Result delivered; the mailbox no longer holds it
    Ready(Envelope),
    /// Workflow still running
    Pending,
}

/// One retrieval attempt against a mailbox
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    async fn fetch(&self, kind: CallbackKind, session_id: &SessionId) -> ClientResult<Retrieval>;
}

/// Wire shape of the mailbox GET response
#[derive(Debug, Deserialize)]
struct RetrievalBody {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

/// Mailbox service client
#[derive(Debug, Clone)]
pub struct HttpRetrievalClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRetrievalClient {
    /// `base_url` is the mailbox service root, e.g. `http://127.0.0.1:5790`
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url_for(&self, kind: CallbackKind) -> String {
        format!("{}{}", self.base_url, kind.route_path())
    }
}

#[async_trait]
impl RetrievalClient for HttpRetrievalClient {
    async fn fetch(&self, kind: CallbackKind, session_id: &SessionId) -> ClientResult<Retrieval> {
        let response = self
            .http
            .get(self.url_for(kind))
            .query(&[("session_id", session_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RetrievalBody = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("mailbox response: {}", e)))?;

        decode_retrieval(kind, body)
    }
}

fn decode_retrieval(kind: CallbackKind, body: RetrievalBody) -> ClientResult<Retrieval> {
    match (body.success, body.data) {
        (true, Some(data)) if !data.is_null() => {
            let envelope = Envelope::from_value(kind, data, wsc_common::time::now())?;
            Ok(Retrieval::Ready(envelope))
        }
        (true, _) => Err(ClientError::Decode(
            "mailbox reported success without data".to_string(),
        )),
        (false, _) => Ok(Retrieval::Pending),
    }
}
