//! Liveness endpoint on a side port. Reports whether the review queue is
//! reachable, how many requests sit in it, and how many resumes are parked
//! awaiting an email modal.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use resumebot_db::DbPool;
use resumebot_discord::pending::PendingResumeCache;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    pending: Arc<PendingResumeCache>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub detail: String,
    /// Requests currently in the review queue, absent when the probe failed.
    pub queued_reviews: Option<i64>,
    /// Attachments held for an email modal that has not come back yet.
    pub pending_resumes: usize,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, pending: Arc<PendingResumeCache>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, pending })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    db_pool: DbPool,
    pending: Arc<PendingResumeCache>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(serve_error) = axum::serve(listener, router(db_pool, pending)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %serve_error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let pending_resumes = state.pending.len().await;

    let (status, detail, queued_reviews) = match queued_review_count(&state.db_pool).await {
        Ok(count) => ("ready", "review queue reachable".to_string(), Some(count)),
        Err(probe_error) => {
            ("degraded", format!("review queue probe failed: {probe_error}"), None)
        }
    };

    let status_code =
        if status == "ready" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let payload = HealthResponse {
        status,
        detail,
        queued_reviews,
        pending_resumes,
        checked_at: Utc::now().to_rfc3339(),
    };

    (status_code, Json(payload))
}

// Probes through the schema the migrations own, so a missing or broken
// `review_requests` table degrades the endpoint just like a dead pool.
async fn queued_review_count(pool: &DbPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM review_requests WHERE status = 'queued'")
        .fetch_one(pool)
        .await
}
