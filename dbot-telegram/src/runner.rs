//! Process entry point: wires config, store, dispatcher and poller, then polls until Ctrl+C / SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use dispatcher::{BotCommand, Dispatcher, LoggingMiddleware, Registry};
use storage::RestDocumentStore;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::api::TelegramApi;
use crate::config::BotConfig;
use crate::poller::Poller;

/// Publishes the registered commands. A failure is logged; polling starts anyway.
pub async fn publish_commands(api: &TelegramApi, commands: &[BotCommand]) -> bool {
    if commands.is_empty() {
        return true;
    }
    match api.set_my_commands(commands).await {
        Ok(accepted) => {
            info!(count = commands.len(), accepted, "step: commands published");
            accepted
        }
        Err(e) => {
            warn!(error = %e, "Failed to publish commands");
            false
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Runs the bot until interrupted. Tracing must already be initialized.
#[instrument(skip(config, api, registry))]
pub async fn start_polling(config: &BotConfig, api: TelegramApi, registry: Registry) -> Result<()> {
    config.validate()?;
    let store = RestDocumentStore::new(&config.database_url, config.database_auth.clone())?;
    info!(
        database_url = %store.base_url(),
        poll_timeout = config.poll_timeout,
        ignore_current_batch = config.ignore_current_batch,
        fallbacks = registry.fallback_count(),
        "step: starting bot"
    );

    publish_commands(&api, registry.commands()).await;

    let dispatcher = Arc::new(
        Dispatcher::new(registry, Arc::new(store)).add_middleware(Arc::new(LoggingMiddleware)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let offset = Poller::new(Arc::new(api), dispatcher)
        .timeout(config.poll_timeout)
        .ignore_current_batch(config.ignore_current_batch)
        .run(shutdown_rx)
        .await;

    info!(offset, "Bot stopped");
    Ok(())
}
