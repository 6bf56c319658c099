//! Telegram back-office bot for a beauty salon.
//!
//! Runs the long-poll update stream through a per-chat dispatcher into the
//! dialog controller, and serves health, metrics and the payment stub over
//! HTTP.

mod config;
mod dispatcher;
mod error;
mod metrics;
mod routes;
mod state;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use database::Database;
use dialog::{Controller, DialogSettings, PgDialogStore};
use telegram::{BotClient, BotConfig, ReconnectConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::metrics::Metrics;
use crate::state::AppState;
use crate::transport::TelegramSender;

/// How long the HTTP server and chat workers get to finish after a signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    init_tracing(config.log_level());
    info!(env = %config.app.env, addr = %config.http.addr, "Starting salon bot");

    let db = Database::connect(config.dsn()).await?;
    db.migrate().await?;

    let bot_config = BotConfig::new(config.token())
        .with_api_url(config.telegram.api_url.clone())
        .with_poll_timeout(config.poll_timeout());
    let client = BotClient::connect(bot_config).await?;

    let settings = DialogSettings {
        admin_chat_id: config.telegram.admin_chat_id,
        offset: config.offset()?,
        payment_base_url: config.app.payment_base_url.clone(),
    };
    let store = Arc::new(PgDialogStore::new(db.pool().clone()));
    let controller = Arc::new(Controller::new(
        db.pool().clone(),
        store,
        TelegramSender::new(client.clone()),
        settings,
    ));

    let metrics = Arc::new(Metrics::new());
    let state = AppState::new(db.clone(), Arc::clone(&metrics), controller.stats());
    let app = routes::router(config.metrics.enabled).with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr()?).await?;
    info!(addr = %config.http.addr, metrics = config.metrics.enabled, "HTTP server listening");

    let cancel = CancellationToken::new();

    let http_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_cancel.cancelled().await })
            .await
    });

    let updates = telegram::subscribe_with_reconnect(&client, ReconnectConfig::default());
    let events = transport::chat_events(updates, Arc::clone(&metrics));
    let dispatcher = Dispatcher::new(
        controller,
        DispatcherConfig {
            max_workers: config.dispatcher.max_workers,
            idle: config.idle(),
        },
        metrics,
        cancel.clone(),
    );
    let mut chats = tokio::spawn(dispatcher.run(events));

    let chats_done = tokio::select! {
        () = shutdown_signal() => false,
        result = &mut chats => {
            if let Err(e) = result {
                error!("Dispatcher task failed: {}", e);
            }
            true
        }
    };

    info!("Shutting down");
    cancel.cancel();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("HTTP server did not drain within {:?}", SHUTDOWN_GRACE),
    }
    if !chats_done && tokio::time::timeout(SHUTDOWN_GRACE, chats).await.is_err() {
        warn!("Chat workers did not finish within {:?}", SHUTDOWN_GRACE);
    }

    db.close().await;
    info!("Salon bot stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
