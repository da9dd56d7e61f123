use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use resumebot_core::domain::review::{
    CommitOutcome, NewReviewRequest, ReviewRequest, ReviewRequestId, ReviewStatus,
};
use resumebot_core::domain::user::{User, UserId};

use super::{RepositoryError, ReviewStore, UserRepository};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    requests: Vec<ReviewRequest>,
}

/// Lock-serialized store with the same commit contract as [`super::SqlReviewStore`].
/// The whole check-and-commit runs under one write lock, so concurrent
/// duplicate submissions cannot both take the last quota slot.
#[derive(Default)]
pub struct InMemoryReviewStore {
    inner: RwLock<Inner>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn request_count(&self) -> usize {
        self.inner.read().await.requests.len()
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryReviewStore {
    async fn find_by_discord_id(
        &self,
        discord_user_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(discord_user_id).cloned())
    }
}

#[async_trait::async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn commit(
        &self,
        request: NewReviewRequest,
        review_limit: u32,
    ) -> Result<CommitOutcome, RepositoryError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let review_count = match inner.users.get_mut(&request.discord_user_id) {
            Some(user) => {
                if user.resume_review_count >= review_limit {
                    return Ok(CommitOutcome::QuotaExceeded);
                }
                user.resume_review_count += 1;
                user.email = request.email.clone();
                user.display_name = request.display_name.clone();
                user.last_requested_at = now;
                user.updated_at = now;
                user.resume_review_count
            }
            None => {
                inner.users.insert(
                    request.discord_user_id.clone(),
                    User {
                        id: UserId::generate(),
                        discord_user_id: request.discord_user_id.clone(),
                        email: request.email.clone(),
                        display_name: request.display_name.clone(),
                        resume_review_count: 1,
                        last_requested_at: now,
                        created_at: now,
                        updated_at: now,
                    },
                );
                1
            }
        };

        let user_id = inner.users.get(&request.discord_user_id).map(|user| user.id.clone());
        let request_id = ReviewRequestId::generate();
        inner.requests.push(ReviewRequest {
            id: request_id.clone(),
            user_id,
            discord_user_id: request.discord_user_id,
            display_name: request.display_name,
            email: request.email,
            attachment: request.attachment,
            status: ReviewStatus::Queued,
            created_at: now,
        });

        Ok(CommitOutcome::Accepted { request_id, review_count })
    }

    async fn find_request(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.requests.iter().find(|request| &request.id == id).cloned())
    }
}
