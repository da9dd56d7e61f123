use async_trait::async_trait;
use thiserror::Error;

use resumebot_core::domain::review::{CommitOutcome, NewReviewRequest, ReviewRequest, ReviewRequestId};
use resumebot_core::domain::user::User;

pub mod memory;
pub mod review;
pub mod user;

pub use memory::InMemoryReviewStore;
pub use review::SqlReviewStore;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Quota store lookup surface. The dispatcher uses `find_by_discord_id` as a
/// cheap pre-check; the authoritative count movement happens inside
/// [`ReviewStore::commit`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_discord_id(
        &self,
        discord_user_id: &str,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Enqueues accepted review requests. `commit` performs the user upsert and
/// the request insert as one unit: either both writes land and a quota slot
/// was taken, or the outcome reports the quota as exceeded and nothing was
/// written. Duplicate commits for a user at the limit cannot both succeed.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn commit(
        &self,
        request: NewReviewRequest,
        review_limit: u32,
    ) -> Result<CommitOutcome, RepositoryError>;

    async fn find_request(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError>;
}
