//! Outbound Discord REST client for operational notifications.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use resumebot_discord::notify::{NoopOpsNotifier, NotifyError, OpsNotifier, ReviewNotification};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Posts the notification summary to the configured ops channel using the
/// bot token. Failures surface as [`NotifyError`] and are only logged by the
/// dispatcher.
pub struct DiscordOpsNotifier {
    http: Client,
    bot_token: SecretString,
    channel_id: String,
    api_base: String,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

impl DiscordOpsNotifier {
    pub fn new(bot_token: SecretString, channel_id: String) -> Self {
        Self { http: Client::new(), bot_token, channel_id, api_base: DISCORD_API_BASE.to_owned() }
    }
}

#[async_trait::async_trait]
impl OpsNotifier for DiscordOpsNotifier {
    async fn notify(&self, notification: ReviewNotification) -> Result<(), NotifyError> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let content = notification.summary_line();

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token.expose_secret()))
            .json(&CreateMessage { content: &content })
            .send()
            .await
            .map_err(|error| NotifyError::Delivery(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!("discord api returned {status}")));
        }
        Ok(())
    }
}

/// Statically dispatched notifier choice, driven by configuration.
pub enum Notifier {
    Discord(DiscordOpsNotifier),
    Noop(NoopOpsNotifier),
}

impl Notifier {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop(_))
    }
}

#[async_trait::async_trait]
impl OpsNotifier for Notifier {
    async fn notify(&self, notification: ReviewNotification) -> Result<(), NotifyError> {
        match self {
            Self::Discord(notifier) => notifier.notify(notification).await,
            Self::Noop(notifier) => notifier.notify(notification).await,
        }
    }
}
