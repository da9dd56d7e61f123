//! The `/interactions` webhook endpoint.
//!
//! Signature check, payload parsing, and dispatch. Validation outcomes travel
//! back as 200 responses carrying an ephemeral message; only unverifiable or
//! unrecognizable requests get a 4xx.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use resumebot_core::domain::review::{CommitOutcome, NewReviewRequest};
use resumebot_core::domain::user::User;
use resumebot_core::errors::ApplicationError;
use resumebot_db::repositories::{
    ReviewStore as DbReviewStore, SqlReviewStore, SqlUserRepository, UserRepository,
};
use resumebot_db::DbPool;
use resumebot_discord::dispatcher::{EventContext, InteractionDispatcher, ReviewStore};
use resumebot_discord::interactions::parse_interaction;
use resumebot_discord::notify::OpsNotifier;
use resumebot_discord::responses::InteractionResponse;

use crate::notify::Notifier;
use crate::verify::SignatureVerifier;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Bridges the dispatcher's storage seam onto the sqlite repositories.
pub struct SqlStoreAdapter {
    users: SqlUserRepository,
    reviews: SqlReviewStore,
}

impl SqlStoreAdapter {
    pub fn new(pool: DbPool) -> Self {
        Self { users: SqlUserRepository::new(pool.clone()), reviews: SqlReviewStore::new(pool) }
    }
}

#[async_trait::async_trait]
impl ReviewStore for SqlStoreAdapter {
    async fn find_user(&self, discord_user_id: &str) -> Result<Option<User>, ApplicationError> {
        self.users
            .find_by_discord_id(discord_user_id)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }

    async fn commit(
        &self,
        request: NewReviewRequest,
        review_limit: u32,
    ) -> Result<CommitOutcome, ApplicationError> {
        self.reviews
            .commit(request, review_limit)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }
}

pub struct InteractionState<S, N> {
    pub dispatcher: Arc<InteractionDispatcher<S, N>>,
    pub verifier: Arc<dyn SignatureVerifier>,
}

impl<S, N> Clone for InteractionState<S, N> {
    fn clone(&self) -> Self {
        Self { dispatcher: Arc::clone(&self.dispatcher), verifier: Arc::clone(&self.verifier) }
    }
}

pub type AppInteractionState = InteractionState<SqlStoreAdapter, Notifier>;

pub fn router<S, N>(state: InteractionState<S, N>) -> Router
where
    S: ReviewStore + 'static,
    N: OpsNotifier + 'static,
{
    Router::new().route("/interactions", post(handle::<S, N>)).with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message.to_owned() })).into_response()
}

async fn handle<S, N>(
    State(state): State<InteractionState<S, N>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: ReviewStore + 'static,
    N: OpsNotifier + 'static,
{
    let ctx = EventContext { correlation_id: uuid::Uuid::new_v4().to_string() };

    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    let timestamp = headers.get(TIMESTAMP_HEADER).and_then(|value| value.to_str().ok());
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        warn!(
            event_name = "interaction.signature.missing",
            correlation_id = %ctx.correlation_id,
            "rejecting request without signature headers"
        );
        return error_response(StatusCode::UNAUTHORIZED, "invalid request signature");
    };

    if let Err(verify_error) = state.verifier.verify(timestamp, &body, signature) {
        warn!(
            event_name = "interaction.signature.invalid",
            correlation_id = %ctx.correlation_id,
            error = %verify_error,
            "rejecting request with a bad signature"
        );
        return error_response(StatusCode::UNAUTHORIZED, "invalid request signature");
    }

    let event = match parse_interaction(&body) {
        Ok(event) => event,
        Err(parse_error) => {
            info!(
                event_name = "interaction.payload.malformed",
                correlation_id = %ctx.correlation_id,
                error = %parse_error,
                "rejecting malformed interaction payload"
            );
            return error_response(StatusCode::BAD_REQUEST, "malformed interaction payload");
        }
    };

    match state.dispatcher.dispatch(event, &ctx).await {
        InteractionResponse::ClientError(message) => {
            error_response(StatusCode::BAD_REQUEST, message)
        }
        response => match response.to_callback() {
            Some(callback) => (StatusCode::OK, Json(callback)).into_response(),
            None => error_response(StatusCode::BAD_REQUEST, "unknown interaction"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use resumebot_core::config::EmailCollection;
    use resumebot_core::domain::review::{CommitOutcome, NewReviewRequest};
    use resumebot_core::domain::user::User;
    use resumebot_core::errors::ApplicationError;
    use resumebot_db::repositories::{
        InMemoryReviewStore, ReviewStore as DbReviewStore, UserRepository,
    };
    use resumebot_discord::dispatcher::{InteractionDispatcher, ReviewPolicy, ReviewStore};
    use resumebot_discord::notify::NoopOpsNotifier;
    use resumebot_discord::pending::PendingResumeCache;

    use super::{router, InteractionState};
    use crate::verify::{SignatureVerifier, VerifyError};

    struct MemoryStoreAdapter {
        inner: InMemoryReviewStore,
    }

    #[async_trait::async_trait]
    impl ReviewStore for MemoryStoreAdapter {
        async fn find_user(&self, discord_user_id: &str) -> Result<Option<User>, ApplicationError> {
            self.inner
                .find_by_discord_id(discord_user_id)
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))
        }

        async fn commit(
            &self,
            request: NewReviewRequest,
            review_limit: u32,
        ) -> Result<CommitOutcome, ApplicationError> {
            self.inner
                .commit(request, review_limit)
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))
        }
    }

    struct AcceptAllVerifier;

    impl SignatureVerifier for AcceptAllVerifier {
        fn verify(&self, _: &str, _: &[u8], _: &str) -> Result<(), VerifyError> {
            Ok(())
        }
    }

    struct RejectAllVerifier;

    impl SignatureVerifier for RejectAllVerifier {
        fn verify(&self, _: &str, _: &[u8], _: &str) -> Result<(), VerifyError> {
            Err(VerifyError::Invalid)
        }
    }

    fn test_router(verifier: Arc<dyn SignatureVerifier>) -> axum::Router {
        let policy = ReviewPolicy {
            command_name: "resume-review".to_owned(),
            review_channel_id: None,
            review_limit: 1,
            email_collection: EmailCollection::Modal,
        };
        let dispatcher = InteractionDispatcher::new(
            policy,
            Arc::new(PendingResumeCache::new(Duration::from_secs(60))),
            Arc::new(MemoryStoreAdapter { inner: InMemoryReviewStore::new() }),
            Arc::new(NoopOpsNotifier),
        );
        router(InteractionState { dispatcher: Arc::new(dispatcher), verifier })
    }

    fn signed_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .header("x-signature-ed25519", "aa".repeat(64))
            .header("x-signature-timestamp", "1724500000")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn a_verified_ping_is_answered_with_pong() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let response = app
            .oneshot(signed_request(r#"{"id":"I-1","type":1}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"type": 1}));
    }

    #[tokio::test]
    async fn requests_without_signature_headers_are_unauthorized() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let request = Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"id":"I-1","type":1}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "invalid request signature");
    }

    #[tokio::test]
    async fn requests_with_a_bad_signature_are_unauthorized() {
        let app = test_router(Arc::new(RejectAllVerifier));

        let response = app
            .oneshot(signed_request(r#"{"id":"I-1","type":1}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_payloads_are_bad_requests() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let response = app.oneshot(signed_request("not json")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "malformed interaction payload");
    }

    #[tokio::test]
    async fn unknown_commands_get_a_structured_error_body() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let body = r#"{"id":"I-1","type":2,"data":{"name":"other-command"}}"#;
        let response = app.oneshot(signed_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "unknown command");
    }

    #[tokio::test]
    async fn a_valid_command_opens_the_email_modal() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let body = r#"{
            "id": "I-1",
            "type": 2,
            "member": {"user": {"id": "U-1", "username": "ada", "global_name": "Ada"}},
            "data": {
                "name": "resume-review",
                "options": [{"name": "resume", "value": "A-1"}],
                "resolved": {
                    "attachments": {
                        "A-1": {
                            "filename": "resume.pdf",
                            "content_type": "application/pdf",
                            "size": 1048576,
                            "url": "https://cdn.example/resume.pdf"
                        }
                    }
                }
            }
        }"#;

        let response = app.oneshot(signed_request(body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = json_body(response).await;
        assert_eq!(payload["type"], 9);
        assert_eq!(payload["data"]["custom_id"], "email_modal_I-1");
    }

    #[tokio::test]
    async fn a_rejected_attachment_still_answers_200_with_an_ephemeral_message() {
        let app = test_router(Arc::new(AcceptAllVerifier));

        let body = r#"{
            "id": "I-1",
            "type": 2,
            "member": {"user": {"id": "U-1", "username": "ada"}},
            "data": {"name": "resume-review"}
        }"#;

        let response = app.oneshot(signed_request(body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = json_body(response).await;
        assert_eq!(payload["type"], 4);
        assert_eq!(payload["data"]["flags"], 64);
        assert!(payload["data"]["content"]
            .as_str()
            .expect("content")
            .contains("No attachment found"));
    }
}
