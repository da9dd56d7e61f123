//! Best-effort operational notifications.
//!
//! When a review request is accepted, a short summary can be posted to an ops
//! channel. Delivery is fire-and-forget: a failed notification is logged and
//! never affects the reply the user already received.

use async_trait::async_trait;
use thiserror::Error;

/// Summary of an accepted review request, for the ops channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewNotification {
    pub request_id: String,
    pub discord_user_id: String,
    pub display_name: String,
    pub email: String,
    pub filename: String,
}

impl ReviewNotification {
    pub fn summary_line(&self) -> String {
        format!(
            "📥 New resume review queued: **{}** (<@{}>)\n📄 {} → 📧 {}",
            self.display_name, self.discord_user_id, self.filename, self.email
        )
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait OpsNotifier: Send + Sync {
    async fn notify(&self, notification: ReviewNotification) -> Result<(), NotifyError>;
}

/// Notifier used when no ops channel is configured.
pub struct NoopOpsNotifier;

#[async_trait]
impl OpsNotifier for NoopOpsNotifier {
    async fn notify(&self, _notification: ReviewNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}
