mod bootstrap;
mod health;
mod interactions;
mod notify;
mod verify;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use resumebot_core::config::{AppConfig, LoadOptions};
use resumebot_discord::pending::PendingResumeCache;

fn init_logging(config: &AppConfig) {
    use resumebot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        Arc::clone(&app.pending),
    )
    .await?;

    spawn_cache_sweeper(Arc::clone(&app.pending));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "resumebot-server accepting interactions"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let router = interactions::router(app.interaction_state.clone());
    let server_task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "resumebot-server stopping"
    );
    let _ = shutdown_tx.send(());

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server_task).await {
        Ok(joined) => joined??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.forced_shutdown",
                correlation_id = "shutdown",
                grace_secs = app.config.server.graceful_shutdown_secs,
                "open connections did not drain within the grace period"
            );
        }
    }

    Ok(())
}

// Stale pending entries are also dropped lazily on claim; the sweeper just
// keeps an abandoned cache from growing.
fn spawn_cache_sweeper(pending: Arc<PendingResumeCache>) {
    const SWEEP_PERIOD: Duration = Duration::from_secs(60);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_PERIOD);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = pending.purge_expired().await;
            if purged > 0 {
                tracing::debug!(
                    event_name = "pending.sweep",
                    purged,
                    "dropped stale pending resumes"
                );
            }
        }
    });
}
