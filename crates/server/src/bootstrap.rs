use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use resumebot_core::config::{AppConfig, ConfigError, LoadOptions};
use resumebot_db::{connect, migrations, DbPool};
use resumebot_discord::dispatcher::{InteractionDispatcher, ReviewPolicy};
use resumebot_discord::notify::NoopOpsNotifier;
use resumebot_discord::pending::PendingResumeCache;

use crate::interactions::{AppInteractionState, InteractionState, SqlStoreAdapter};
use crate::notify::{DiscordOpsNotifier, Notifier};
use crate::verify::{Ed25519Verifier, VerifyError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub pending: Arc<PendingResumeCache>,
    pub interaction_state: AppInteractionState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("signature verifier setup failed: {0}")]
    Verifier(#[source] VerifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let verifier =
        Ed25519Verifier::from_hex(&config.discord.public_key).map_err(BootstrapError::Verifier)?;

    let notifier = match &config.discord.ops_channel_id {
        Some(channel_id) => Notifier::Discord(DiscordOpsNotifier::new(
            config.discord.bot_token.expose_secret().to_owned().into(),
            channel_id.clone(),
        )),
        None => Notifier::Noop(NoopOpsNotifier),
    };
    info!(
        event_name = "system.bootstrap.notifier_mode",
        correlation_id = "bootstrap",
        mode = if notifier.is_noop() { "noop" } else { "discord" },
        "ops notifier initialized"
    );

    let pending =
        Arc::new(PendingResumeCache::new(Duration::from_secs(config.discord.pending_ttl_secs)));

    let dispatcher = InteractionDispatcher::new(
        ReviewPolicy::from_config(&config.discord),
        Arc::clone(&pending),
        Arc::new(SqlStoreAdapter::new(db_pool.clone())),
        Arc::new(notifier),
    );

    let interaction_state = InteractionState {
        dispatcher: Arc::new(dispatcher),
        verifier: Arc::new(verifier),
    };

    Ok(Application { config, db_pool, pending, interaction_state })
}

#[cfg(test)]
mod tests {
    use resumebot_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    const TEST_PUBLIC_KEY: &str =
        "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_public_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("discord.public_key"));
    }

    #[tokio::test]
    async fn bootstrap_connects_migrates_and_wires_the_dispatcher() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                discord_public_key: Some(TEST_PUBLIC_KEY.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('users', 'review_requests')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 2, "bootstrap should expose the baseline review tables");

        assert!(app.pending.is_empty().await, "pending cache starts empty");

        app.db_pool.close().await;
    }
}
