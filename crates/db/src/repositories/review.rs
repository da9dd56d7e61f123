use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use resumebot_core::domain::review::{
    AttachmentMeta, CommitOutcome, NewReviewRequest, ReviewRequest, ReviewRequestId, ReviewStatus,
};
use resumebot_core::domain::user::UserId;

use super::user::{parse_timestamp, parse_u32, parse_u64};
use super::{RepositoryError, ReviewStore};
use crate::DbPool;

pub struct SqlReviewStore {
    pool: DbPool,
}

impl SqlReviewStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReviewStore for SqlReviewStore {
    async fn commit(
        &self,
        request: NewReviewRequest,
        review_limit: u32,
    ) -> Result<CommitOutcome, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Conditional upsert: a fresh user is created with count 1; an existing
        // user is only incremented while still under the limit. Zero affected
        // rows means the quota slot was not taken and nothing may be written.
        let candidate_user_id = UserId::generate();
        let reserved = sqlx::query(
            "INSERT INTO users (
                id,
                discord_user_id,
                email,
                display_name,
                resume_review_count,
                last_requested_at,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, 1, ?, ?, ?)
             ON CONFLICT(discord_user_id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                resume_review_count = users.resume_review_count + 1,
                last_requested_at = excluded.last_requested_at,
                updated_at = excluded.updated_at
             WHERE users.resume_review_count < ?",
        )
        .bind(&candidate_user_id.0)
        .bind(&request.discord_user_id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(i64::from(review_limit))
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::QuotaExceeded);
        }

        // The update branch keeps the existing row id, so re-read it.
        let user_row =
            sqlx::query("SELECT id, resume_review_count FROM users WHERE discord_user_id = ?")
                .bind(&request.discord_user_id)
                .fetch_one(&mut *tx)
                .await?;
        let user_id: String = user_row.try_get("id")?;
        let review_count = parse_u32("resume_review_count", user_row.try_get("resume_review_count")?)?;

        let request_id = ReviewRequestId::generate();
        sqlx::query(
            "INSERT INTO review_requests (
                id,
                user_id,
                discord_user_id,
                display_name,
                email,
                attachment_url,
                attachment_filename,
                attachment_content_type,
                attachment_size_bytes,
                status,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request_id.0)
        .bind(&user_id)
        .bind(&request.discord_user_id)
        .bind(&request.display_name)
        .bind(&request.email)
        .bind(&request.attachment.url)
        .bind(&request.attachment.filename)
        .bind(request.attachment.content_type.as_deref())
        .bind(i64::try_from(request.attachment.size_bytes).map_err(|_| {
            RepositoryError::Decode(format!(
                "attachment size out of range: {}",
                request.attachment.size_bytes
            ))
        })?)
        .bind(ReviewStatus::Queued.as_str())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Accepted { request_id, review_count })
    }

    async fn find_request(
        &self,
        id: &ReviewRequestId,
    ) -> Result<Option<ReviewRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                user_id,
                discord_user_id,
                display_name,
                email,
                attachment_url,
                attachment_filename,
                attachment_content_type,
                attachment_size_bytes,
                status,
                created_at
             FROM review_requests
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(request_from_row).transpose()
    }
}

fn request_from_row(row: SqliteRow) -> Result<ReviewRequest, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = ReviewStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown review request status `{status_raw}`"))
    })?;

    Ok(ReviewRequest {
        id: ReviewRequestId(row.try_get("id")?),
        user_id: row.try_get::<Option<String>, _>("user_id")?.map(UserId),
        discord_user_id: row.try_get("discord_user_id")?,
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        attachment: AttachmentMeta {
            url: row.try_get("attachment_url")?,
            filename: row.try_get("attachment_filename")?,
            content_type: row.try_get("attachment_content_type")?,
            size_bytes: parse_u64("attachment_size_bytes", row.try_get("attachment_size_bytes")?)?,
        },
        status,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use resumebot_core::domain::review::{AttachmentMeta, CommitOutcome, NewReviewRequest, ReviewStatus};

    use super::SqlReviewStore;
    use crate::migrations;
    use crate::repositories::{ReviewStore, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, DbPool};

    fn new_request(discord_user_id: &str) -> NewReviewRequest {
        NewReviewRequest {
            discord_user_id: discord_user_id.to_owned(),
            display_name: "Ada".to_owned(),
            email: "a@b.co".to_owned(),
            attachment: AttachmentMeta {
                filename: "resume.pdf".to_owned(),
                content_type: Some("application/pdf".to_owned()),
                size_bytes: 1_572_864,
                url: "https://cdn.example/resume.pdf".to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn commit_creates_user_and_queued_request() {
        let pool = setup_pool().await;
        let store = SqlReviewStore::new(pool.clone());

        let outcome = store.commit(new_request("D-200"), 1).await.expect("commit");
        let request_id = match outcome {
            CommitOutcome::Accepted { request_id, review_count } => {
                assert_eq!(review_count, 1);
                request_id
            }
            CommitOutcome::QuotaExceeded => panic!("first commit must be accepted"),
        };

        let users = SqlUserRepository::new(pool.clone());
        let user = users.find_by_discord_id("D-200").await.expect("lookup").expect("present");
        assert_eq!(user.resume_review_count, 1);
        assert_eq!(user.email, "a@b.co");

        let stored = store.find_request(&request_id).await.expect("find").expect("present");
        assert_eq!(stored.status, ReviewStatus::Queued);
        assert_eq!(stored.attachment.filename, "resume.pdf");
        assert_eq!(stored.user_id, Some(user.id));

        pool.close().await;
    }

    #[tokio::test]
    async fn commit_rejects_user_at_quota_without_writing_anything() {
        let pool = setup_pool().await;
        let store = SqlReviewStore::new(pool.clone());

        let first = store.commit(new_request("D-201"), 1).await.expect("first commit");
        assert!(matches!(first, CommitOutcome::Accepted { .. }));

        let second = store.commit(new_request("D-201"), 1).await.expect("second commit");
        assert_eq!(second, CommitOutcome::QuotaExceeded);

        let users = SqlUserRepository::new(pool.clone());
        let user = users.find_by_discord_id("D-201").await.expect("lookup").expect("present");
        assert_eq!(user.resume_review_count, 1, "rejected commit must not move the counter");

        let (request_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM review_requests WHERE discord_user_id = 'D-201'",
        )
        .fetch_one(&pool)
        .await
        .expect("count requests");
        assert_eq!(request_count, 1, "rejected commit must not enqueue a request");

        pool.close().await;
    }

    #[tokio::test]
    async fn higher_limit_allows_repeat_commits_and_updates_profile_fields() {
        let pool = setup_pool().await;
        let store = SqlReviewStore::new(pool.clone());

        let first = store.commit(new_request("D-202"), 2).await.expect("first commit");
        assert!(matches!(first, CommitOutcome::Accepted { review_count: 1, .. }));

        let mut updated = new_request("D-202");
        updated.email = "new@b.co".to_owned();
        let second = store.commit(updated, 2).await.expect("second commit");
        assert!(matches!(second, CommitOutcome::Accepted { review_count: 2, .. }));

        let users = SqlUserRepository::new(pool.clone());
        let user = users.find_by_discord_id("D-202").await.expect("lookup").expect("present");
        assert_eq!(user.resume_review_count, 2);
        assert_eq!(user.email, "new@b.co", "accepted commit refreshes the stored email");

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }
}
