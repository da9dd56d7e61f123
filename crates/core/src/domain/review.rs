use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewRequestId(pub String);

impl ReviewRequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Lifecycle of a review request as this service sees it. Only `Queued` is
/// ever written or read back here; the analysis worker owns every later
/// transition, and `parse` rejects those states so a worker-owned row is never
/// mistaken for a freshly queued one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Queued,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            _ => None,
        }
    }
}

/// Metadata of an uploaded resume as reported by the platform. The file
/// content itself is never fetched here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub url: String,
}

/// Input to the commit step: everything needed to upsert the user and enqueue
/// the request as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReviewRequest {
    pub discord_user_id: String,
    pub display_name: String,
    pub email: String,
    pub attachment: AttachmentMeta,
}

/// Result of the atomic commit: either a quota slot was taken and the request
/// row exists, or the user was already at the limit and nothing was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Accepted { request_id: ReviewRequestId, review_count: u32 },
    QuotaExceeded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewRequestId,
    pub user_id: Option<UserId>,
    pub discord_user_id: String,
    pub display_name: String,
    pub email: String,
    pub attachment: AttachmentMeta,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}
