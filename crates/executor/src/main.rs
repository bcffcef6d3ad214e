use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{debug, info, warn};

use brokerage::remote::AlpacaClient;
use common::actors::Actor;
use common::logger;
use common::traits::{BrokerClient, SignalQueue};
use storage::db;
use storage::repositories::SignalRepository;
use storage::settings_store::SettingsStore;

use crate::actors::supervisor::{ActorFactory, Supervisor};
use crate::api::AppState;
use crate::config::EngineConfig;
use crate::services::execution_service::{EngineContext, ExecutionService};
use crate::services::telegram_service::TelegramService;
use crate::state::{EnginePhase, EngineState};

mod actors;
mod api;
mod config;
mod services;
mod state;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    debug!("System starting up...");

    let config = EngineConfig::from_env().context("Invalid configuration")?;

    let pool = db::connect(&config.database_path)
        .await
        .with_context(|| format!("Failed to open signal queue at {}", config.database_path))?;
    let queue: Arc<dyn SignalQueue> = Arc::new(SignalRepository::new(pool));

    if config.purge_on_boot {
        let removed = queue.delete_all().await?;
        info!("Purged {} stale signals on boot", removed);
    }

    let broker: Arc<dyn BrokerClient> = Arc::new(AlpacaClient::new(config.alpaca.clone())?);
    let settings = Arc::new(SettingsStore::new(&config.settings_path));
    let state = Arc::new(EngineState::new());

    let (notify_tx, _) = broadcast::channel::<String>(256);
    match &config.telegram {
        Some(telegram) => {
            let telegram_svc = TelegramService::new(telegram);
            tokio::spawn(telegram_svc.start(notify_tx.subscribe()));
        }
        None => warn!("Telegram not configured; execution notices are only logged"),
    }

    let ctx = EngineContext {
        broker: broker.clone(),
        queue: queue.clone(),
        state: state.clone(),
        timing: config.timing,
    };
    let factory: ActorFactory = Arc::new(move |trading_settings| {
        Box::new(
            ExecutionService::new(ctx.clone(), trading_settings).with_notifier(notify_tx.clone()),
        ) as Box<dyn Actor>
    });

    let supervisor = Arc::new(Supervisor::new(
        state,
        broker.clone(),
        settings.clone(),
        factory,
    ));

    let app = api::router(Arc::new(AppState {
        passphrase: config.webhook_passphrase.clone(),
        queue,
        supervisor: supervisor.clone(),
        broker,
        settings,
    }));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if supervisor.phase() == EnginePhase::Running {
        info!("Shutting down; flattening before exit");
        supervisor.stop().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
