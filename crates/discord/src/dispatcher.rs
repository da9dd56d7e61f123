//! The interaction state machine.
//!
//! One dispatcher instance handles every webhook interaction. Commands walk a
//! fixed validation chain (channel, identity, quota pre-check, attachment,
//! email) and end in either an immediate commit, a modal prompt, or an
//! ephemeral rejection. Modal submissions claim their parked attachment and
//! commit. The commit itself is atomic in the store; the pre-check only
//! exists to reject early with a friendly message.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use resumebot_core::config::{DiscordConfig, EmailCollection};
use resumebot_core::domain::review::{AttachmentMeta, CommitOutcome, NewReviewRequest};
use resumebot_core::domain::user::User;
use resumebot_core::errors::ApplicationError;
use resumebot_core::validate::{validate_email, validate_resume_attachment, AttachmentRejection};

use crate::interactions::{
    pending_key, CommandInvocation, InteractionEvent, Invoker, ModalSubmission,
};
use crate::notify::{OpsNotifier, ReviewNotification};
use crate::pending::PendingResumeCache;
use crate::responses::{
    attachment_rejection_message, commit_failed_message, invalid_email_message,
    missing_identity_message, quota_reached_message, session_expired_message, success_message,
    wrong_channel_message, InteractionResponse,
};

/// Persistence seam for the dispatcher. Implemented over sqlite by the server
/// crate and by in-memory fakes in tests.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_user(&self, discord_user_id: &str) -> Result<Option<User>, ApplicationError>;

    /// Atomically takes a quota slot and enqueues the request, or reports
    /// [`CommitOutcome::QuotaExceeded`] without writing anything.
    async fn commit(
        &self,
        request: NewReviewRequest,
        review_limit: u32,
    ) -> Result<CommitOutcome, ApplicationError>;
}

/// Behavioral knobs for the review command, extracted from configuration.
#[derive(Clone, Debug)]
pub struct ReviewPolicy {
    pub command_name: String,
    pub review_channel_id: Option<String>,
    pub review_limit: u32,
    pub email_collection: EmailCollection,
}

impl ReviewPolicy {
    pub fn from_config(config: &DiscordConfig) -> Self {
        Self {
            command_name: config.command_name.clone(),
            review_channel_id: config.review_channel_id.clone(),
            review_limit: config.review_limit,
            email_collection: config.email_collection,
        }
    }
}

/// Per-request metadata carried through logs.
#[derive(Clone, Debug)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

pub struct InteractionDispatcher<S, N> {
    policy: ReviewPolicy,
    pending: Arc<PendingResumeCache>,
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> InteractionDispatcher<S, N>
where
    S: ReviewStore + 'static,
    N: OpsNotifier + 'static,
{
    pub fn new(
        policy: ReviewPolicy,
        pending: Arc<PendingResumeCache>,
        store: Arc<S>,
        notifier: Arc<N>,
    ) -> Self {
        Self { policy, pending, store, notifier }
    }

    pub async fn dispatch(
        &self,
        event: InteractionEvent,
        ctx: &EventContext,
    ) -> InteractionResponse {
        match event {
            InteractionEvent::Ping => InteractionResponse::Pong,
            InteractionEvent::Command(command) => {
                if command.command_name != self.policy.command_name {
                    warn!(
                        event_name = "interaction.command.unknown",
                        correlation_id = %ctx.correlation_id,
                        command_name = %command.command_name,
                        "rejecting unknown command"
                    );
                    return InteractionResponse::ClientError("unknown command");
                }
                self.handle_command(command, ctx).await
            }
            InteractionEvent::ModalSubmit(submission) => {
                let Some(key) = pending_key(&submission.custom_id).map(str::to_owned) else {
                    warn!(
                        event_name = "interaction.modal.unknown",
                        correlation_id = %ctx.correlation_id,
                        custom_id = %submission.custom_id,
                        "rejecting modal with unrecognized custom_id"
                    );
                    return InteractionResponse::ClientError("unknown interaction");
                };
                self.handle_modal(submission, &key, ctx).await
            }
            InteractionEvent::Unsupported { kind } => {
                warn!(
                    event_name = "interaction.unsupported",
                    correlation_id = %ctx.correlation_id,
                    kind,
                    "rejecting unsupported interaction type"
                );
                InteractionResponse::ClientError("unknown interaction type")
            }
        }
    }

    async fn handle_command(
        &self,
        command: CommandInvocation,
        ctx: &EventContext,
    ) -> InteractionResponse {
        if let Some(required) = &self.policy.review_channel_id {
            if command.channel_id.as_deref() != Some(required.as_str()) {
                return InteractionResponse::Ephemeral(wrong_channel_message(required));
            }
        }

        let Some(invoker) = command.invoker else {
            return InteractionResponse::Ephemeral(missing_identity_message());
        };

        // Early quota check so an exhausted user gets the quota answer even
        // with a bad attachment. The commit re-checks atomically.
        match self.store.find_user(&invoker.id).await {
            Ok(Some(user)) if user.at_quota(self.policy.review_limit) => {
                return InteractionResponse::Ephemeral(quota_reached_message(
                    self.policy.review_limit,
                ));
            }
            Ok(_) => {}
            Err(app_error) => {
                let interface = app_error.into_interface(ctx.correlation_id.clone());
                error!(
                    event_name = "review.lookup.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %interface,
                    "quota lookup failed"
                );
                return InteractionResponse::Ephemeral(commit_failed_message());
            }
        }

        let attachment = match command.attachment {
            Some(attachment) => attachment,
            None => {
                return InteractionResponse::Ephemeral(attachment_rejection_message(
                    &AttachmentRejection::Missing,
                ))
            }
        };
        if let Err(rejection) = validate_resume_attachment(Some(&attachment)) {
            info!(
                event_name = "review.attachment.rejected",
                correlation_id = %ctx.correlation_id,
                rejection = %rejection,
                "attachment failed validation"
            );
            return InteractionResponse::Ephemeral(attachment_rejection_message(&rejection));
        }

        match self.policy.email_collection {
            EmailCollection::Inline => {
                let raw = command.email_option.unwrap_or_default();
                match validate_email(&raw) {
                    Ok(email) => self.commit(invoker, email, attachment, ctx).await,
                    Err(rejection) => {
                        InteractionResponse::Ephemeral(invalid_email_message(&rejection.rejected))
                    }
                }
            }
            EmailCollection::Modal => {
                self.pending.insert(command.interaction_id.clone(), attachment).await;
                InteractionResponse::EmailModal { interaction_id: command.interaction_id }
            }
        }
    }

    async fn handle_modal(
        &self,
        submission: ModalSubmission,
        key: &str,
        ctx: &EventContext,
    ) -> InteractionResponse {
        // Claim first: a rejected email also consumes the entry, so the user
        // restarts from the command rather than resubmitting a stale modal.
        let Some(attachment) = self.pending.take(key).await else {
            info!(
                event_name = "review.pending.missing",
                correlation_id = %ctx.correlation_id,
                pending_key = key,
                "modal submitted with no pending resume"
            );
            return InteractionResponse::Ephemeral(session_expired_message());
        };

        let Some(invoker) = submission.invoker else {
            return InteractionResponse::Ephemeral(missing_identity_message());
        };

        let raw = submission.email_value.unwrap_or_default();
        match validate_email(&raw) {
            Ok(email) => self.commit(invoker, email, attachment, ctx).await,
            Err(rejection) => {
                InteractionResponse::Ephemeral(invalid_email_message(&rejection.rejected))
            }
        }
    }

    async fn commit(
        &self,
        invoker: Invoker,
        email: String,
        attachment: AttachmentMeta,
        ctx: &EventContext,
    ) -> InteractionResponse {
        let filename = attachment.filename.clone();
        let request = NewReviewRequest {
            discord_user_id: invoker.id.clone(),
            display_name: invoker.display_name.clone(),
            email: email.clone(),
            attachment,
        };

        match self.store.commit(request, self.policy.review_limit).await {
            Ok(CommitOutcome::Accepted { request_id, review_count }) => {
                info!(
                    event_name = "review.request.accepted",
                    correlation_id = %ctx.correlation_id,
                    request_id = %request_id.0,
                    discord_user_id = %invoker.id,
                    review_count,
                    "resume review request enqueued"
                );
                self.spawn_notification(
                    ReviewNotification {
                        request_id: request_id.0,
                        discord_user_id: invoker.id,
                        display_name: invoker.display_name,
                        email: email.clone(),
                        filename: filename.clone(),
                    },
                    ctx,
                );
                InteractionResponse::Ephemeral(success_message(&filename, &email))
            }
            // Lost a race against a concurrent duplicate; the pre-check saw
            // a free slot but the store said no.
            Ok(CommitOutcome::QuotaExceeded) => {
                InteractionResponse::Ephemeral(quota_reached_message(self.policy.review_limit))
            }
            Err(app_error) => {
                let interface = app_error.into_interface(ctx.correlation_id.clone());
                error!(
                    event_name = "review.commit.failed",
                    correlation_id = %ctx.correlation_id,
                    discord_user_id = %invoker.id,
                    error = %interface,
                    "review request commit failed"
                );
                InteractionResponse::Ephemeral(commit_failed_message())
            }
        }
    }

    fn spawn_notification(&self, notification: ReviewNotification, ctx: &EventContext) {
        let notifier = Arc::clone(&self.notifier);
        let correlation_id = ctx.correlation_id.clone();
        tokio::spawn(async move {
            if let Err(notify_error) = notifier.notify(notification).await {
                warn!(
                    event_name = "review.notify.failed",
                    correlation_id = %correlation_id,
                    error = %notify_error,
                    "operational notification failed"
                );
            }
        });
    }
}
