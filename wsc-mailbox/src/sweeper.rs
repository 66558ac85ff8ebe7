//! Background eviction of abandoned mailbox entries
//!
//! Entries whose poller gave up (or never started) would otherwise stay in the
//! store forever. The sweeper purges expired entries on a fixed interval until
//! the shutdown token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::MailboxStore;

/// Spawn the sweeper task
pub fn spawn_sweeper(
    store: Arc<dyn MailboxStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Mailbox sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    sweep_once(store.as_ref()).await;
                }
            }
        }

        info!("Mailbox sweeper stopped");
    })
}

/// Run one purge pass, logging rather than propagating failures
pub async fn sweep_once(store: &dyn MailboxStore) -> usize {
    match store.purge_expired(wsc_common::time::now()).await {
        Ok(0) => {
            debug!("Sweep found no expired entries");
            0
        }
        Ok(purged) => {
            info!(purged, "Evicted expired mailbox entries");
            purged
        }
        Err(e) => {
            warn!(error = %e, "Mailbox sweep failed, will retry next interval");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MailboxEntry, MailboxKey, MemoryMailbox};
    use serde_json::json;
    use wsc_common::{CallbackKind, Envelope, SessionId};

    async fn put_expired(store: &MemoryMailbox, id: &str) {
        let received_at = wsc_common::time::now() - chrono::Duration::seconds(120);
        let envelope = Envelope::normalize(
            CallbackKind::Assistant,
            json!({"message": "too late"}).as_object().unwrap(),
            received_at,
        );
        store
            .put(
                MailboxKey::new(CallbackKind::Assistant, SessionId::parse(id).unwrap()),
                MailboxEntry::new(envelope, received_at, Duration::from_secs(60)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_once_purges_expired() {
        let store = MemoryMailbox::new();
        put_expired(&store, "a").await;
        put_expired(&store, "b").await;

        assert_eq!(sweep_once(&store).await, 2);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let store: Arc<MemoryMailbox> = Arc::new(MemoryMailbox::new());
        put_expired(&store, "a").await;

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(10), shutdown.clone());

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len().await.unwrap(), 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper exits after shutdown")
            .unwrap();
    }
}
