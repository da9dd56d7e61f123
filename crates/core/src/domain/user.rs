use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Persistent record of a requester, keyed by their Discord user id. Created on
/// the first accepted review request; `resume_review_count` is only ever moved
/// by the quota-guarded commit in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub discord_user_id: String,
    pub email: String,
    pub display_name: String,
    pub resume_review_count: u32,
    pub last_requested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn at_quota(&self, limit: u32) -> bool {
        self.resume_review_count >= limit
    }
}
