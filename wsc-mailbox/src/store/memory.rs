//! In-process mailbox
//!
//! Entries live only as long as the process. Lookup and removal happen under
//! one lock acquisition, which is what makes `take` atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{MailboxEntry, MailboxKey, MailboxStore, PutOutcome, StoreError};

#[derive(Debug, Default)]
pub struct MemoryMailbox {
    entries: Mutex<HashMap<MailboxKey, MailboxEntry>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailboxStore for MemoryMailbox {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: MailboxKey, entry: MailboxEntry) -> Result<PutOutcome, StoreError> {
        let received_at = entry.received_at;
        let previous = self.entries.lock().await.insert(key, entry);
        Ok(PutOutcome {
            replaced: previous.is_some_and(|old| !old.is_expired(received_at)),
        })
    }

    async fn take(&self, key: &MailboxKey, now: DateTime<Utc>) -> Result<Option<MailboxEntry>, StoreError> {
        let entry = self.entries.lock().await.remove(key);
        Ok(entry.filter(|e| !e.is_expired(now)))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.entries.lock().await.len())
    }
}
