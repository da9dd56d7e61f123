//! Short-lived cache of resume attachments awaiting an email modal.
//!
//! The modal round trip splits one logical submission across two webhook
//! deliveries. The attachment metadata from the command leg is parked here,
//! keyed by the command's interaction id, until the modal leg claims it or the
//! entry goes stale.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use resumebot_core::domain::review::AttachmentMeta;

struct Entry {
    attachment: AttachmentMeta,
    stored_at: Instant,
}

pub struct PendingResumeCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl PendingResumeCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    /// Parks an attachment under the command's interaction id. A repeated
    /// delivery of the same interaction replaces the previous entry.
    pub async fn insert(&self, interaction_id: String, attachment: AttachmentMeta) {
        let mut entries = self.entries.write().await;
        entries.insert(interaction_id, Entry { attachment, stored_at: Instant::now() });
    }

    /// Claims and removes the entry for `interaction_id`. Each entry can be
    /// claimed once; a stale entry is dropped and reported as absent.
    pub async fn take(&self, interaction_id: &str) -> Option<AttachmentMeta> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(interaction_id)?;
        if entry.stored_at.elapsed() > self.ttl {
            debug!(
                event_name = "pending.entry.expired",
                interaction_id, "pending resume claimed after its ttl"
            );
            return None;
        }
        Some(entry.attachment)
    }

    /// Drops entries past their ttl. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
