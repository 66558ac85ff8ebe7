//! Mailbox storage
//!
//! A mailbox is a single-slot, read-once cell addressed by
//! `(callback kind, session id)`. The Submission Handler is the only writer and
//! the Retrieval Handler the only reader; the sweeper reclaims entries nobody
//! came back for.
//!
//! Every backend must make `take` atomic per key: of two concurrent takes for
//! the same key, at most one observes the entry.

mod memory;
mod sqlite;

pub use memory::MemoryMailbox;
pub use sqlite::SqliteMailbox;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use wsc_common::{CallbackKind, Envelope, SessionId};

/// Mailbox backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into an entry
    #[error("Corrupt mailbox entry: {0}")]
    Corrupt(String),
}

/// Mailbox address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MailboxKey {
    pub kind: CallbackKind,
    pub session_id: SessionId,
}

impl MailboxKey {
    pub fn new(kind: CallbackKind, session_id: SessionId) -> Self {
        Self { kind, session_id }
    }
}

/// One pending callback result
#[derive(Debug, Clone, PartialEq)]
pub struct MailboxEntry {
    pub envelope: Envelope,
    pub received_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MailboxEntry {
    pub fn new(envelope: Envelope, received_at: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| received_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            envelope,
            received_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// An unconsumed, unexpired entry for the same key was overwritten
    pub replaced: bool,
}

/// Keyed single-slot storage shared by all handlers
#[async_trait]
pub trait MailboxStore: Send + Sync {
    /// Backend name for logs and `/health`
    fn backend_name(&self) -> &'static str;

    /// Unconditional upsert; the last write wins
    async fn put(&self, key: MailboxKey, entry: MailboxEntry) -> Result<PutOutcome, StoreError>;

    /// Remove and return the entry, if present and not expired at `now`
    ///
    /// An expired entry is removed and reported as absent.
    async fn take(&self, key: &MailboxKey, now: DateTime<Utc>) -> Result<Option<MailboxEntry>, StoreError>;

    /// Drop every entry expired at `now`, returning how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of stored entries, expired ones included until purged
    async fn len(&self) -> Result<usize, StoreError>;
}
