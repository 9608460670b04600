//! Headless notification client.
//!
//! Loads configuration from the environment, starts one notification
//! session for `LOOPFUND__AUTH__TOKEN` and logs alerts and badge changes
//! until Ctrl-C.

use std::sync::Arc;

use secrecy::Secret;
use tracing_subscriber::EnvFilter;

use loopfund_notify::adapters::alerts::TracingAlertSink;
use loopfund_notify::adapters::notifications::HttpNotificationApi;
use loopfund_notify::application::{NotificationSession, RefreshOutcome, SessionSettings};
use loopfund_notify::config::{AppConfig, ClientConfig};

fn init_tracing(client: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(client.log_level.as_str()));

    if client.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.client);
    config.validate()?;

    let Some(token) = config.auth.token().map(str::to_string) else {
        tracing::error!("LOOPFUND__AUTH__TOKEN is not set, nothing to do");
        return Err("missing bearer token".into());
    };

    tracing::info!(
        api = %config.api.base_url,
        environment = ?config.client.environment,
        realtime = config.realtime.enabled,
        "Starting notification client"
    );

    let api = HttpNotificationApi::from_config(&config.api, Secret::new(token.clone()))?;
    let session = NotificationSession::new(
        Arc::new(api),
        Arc::new(TracingAlertSink::new()),
        SessionSettings::from_config(&config),
    );

    match session.start(&token).await {
        RefreshOutcome::Loaded {
            notifications,
            unread,
        } => tracing::info!(notifications, unread, "Initial notifications loaded"),
        RefreshOutcome::Failed(e) => {
            tracing::warn!("Initial load failed, waiting for push delivery: {}", e)
        }
        RefreshOutcome::Abandoned => return Ok(()),
    }

    let mut badge = session.subscribe_unread();
    let mut connection = session.subscribe_connection();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = badge.changed() => {
                if changed.is_err() {
                    break;
                }
                let unread = *badge.borrow_and_update();
                tracing::info!(unread, "Unread count changed");
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = connection.borrow_and_update().clone();
                tracing::info!(state = %state, "Push connection state changed");
            }
        }
    }

    session.shutdown();
    tracing::info!("Notification client stopped");
    Ok(())
}
