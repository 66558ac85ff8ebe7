//! SQLite-backed mailbox
//!
//! Lets several server processes share one mailbox file and keeps pending
//! results across restarts. `take` is a single `DELETE ... RETURNING`
//! statement, so SQLite's write lock guarantees one consumer per row.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use wsc_common::{CallbackKind, Envelope};

use super::{MailboxEntry, MailboxKey, MailboxStore, PutOutcome, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mailbox_entries (
    kind TEXT NOT NULL,
    session_id TEXT NOT NULL,
    envelope TEXT NOT NULL,
    received_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    -- 1 when the last write replaced an undelivered, unexpired entry
    replaced_pending INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (kind, session_id)
);
CREATE INDEX IF NOT EXISTS idx_mailbox_entries_expires_at ON mailbox_entries (expires_at);
"#;

#[derive(Debug, Clone)]
pub struct SqliteMailbox {
    pool: SqlitePool,
}

impl SqliteMailbox {
    /// Open (creating if needed) the mailbox database at `path`
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn decode_row(
    kind: CallbackKind,
    envelope_json: &str,
    received_at_ms: i64,
    expires_at_ms: i64,
) -> Result<MailboxEntry, StoreError> {
    let received_at = DateTime::from_timestamp_millis(received_at_ms)
        .ok_or_else(|| StoreError::Corrupt(format!("received_at out of range: {}", received_at_ms)))?;
    let expires_at = DateTime::from_timestamp_millis(expires_at_ms)
        .ok_or_else(|| StoreError::Corrupt(format!("expires_at out of range: {}", expires_at_ms)))?;

    let value: serde_json::Value = serde_json::from_str(envelope_json)
        .map_err(|e| StoreError::Corrupt(format!("envelope is not JSON: {}", e)))?;
    let envelope = Envelope::from_value(kind, value, received_at)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(MailboxEntry {
        envelope,
        received_at,
        expires_at,
    })
}

#[async_trait]
impl MailboxStore for SqliteMailbox {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn put(&self, key: MailboxKey, entry: MailboxEntry) -> Result<PutOutcome, StoreError> {
        let envelope_json = entry.envelope.to_value().to_string();
        let received_at = entry.received_at.timestamp_millis();

        // One statement: SQLite takes the write lock up front, so concurrent
        // writers wait on busy_timeout instead of failing a lock upgrade
        let (replaced,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO mailbox_entries (kind, session_id, envelope, received_at, expires_at, replaced_pending)
            VALUES (?, ?, ?, ?, ?, 0)
            ON CONFLICT (kind, session_id) DO UPDATE SET
                replaced_pending = mailbox_entries.expires_at > excluded.received_at,
                envelope = excluded.envelope,
                received_at = excluded.received_at,
                expires_at = excluded.expires_at
            RETURNING replaced_pending
            "#,
        )
        .bind(key.kind.as_str())
        .bind(key.session_id.as_str())
        .bind(&envelope_json)
        .bind(received_at)
        .bind(entry.expires_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(PutOutcome {
            replaced: replaced != 0,
        })
    }

    async fn take(&self, key: &MailboxKey, now: DateTime<Utc>) -> Result<Option<MailboxEntry>, StoreError> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(
            r#"
            DELETE FROM mailbox_entries
            WHERE kind = ? AND session_id = ?
            RETURNING envelope, received_at, expires_at
            "#,
        )
        .bind(key.kind.as_str())
        .bind(key.session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((envelope_json, received_at, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now.timestamp_millis() {
            return Ok(None);
        }

        decode_row(key.kind, &envelope_json, received_at, expires_at).map(Some)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM mailbox_entries WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mailbox_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
