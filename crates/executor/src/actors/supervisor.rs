use std::sync::Arc;
use std::time::Duration;

use common::actors::{Actor, ControlMessage};
use common::models::{CloseAllReport, TradingSettings};
use common::traits::BrokerClient;
use storage::settings_store::SettingsStore;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time,
};
use tracing::{error, info, warn};

use crate::state::{EnginePhase, EngineState};

pub type ActorFactory = Arc<dyn Fn(TradingSettings) -> Box<dyn Actor> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub previous: EnginePhase,
    pub cancelled_orders: Option<usize>,
    pub flatten: Option<CloseAllReport>,
}

/// Owns the single execution task slot and the start/stop transitions.
pub struct Supervisor {
    state: Arc<EngineState>,
    broker: Arc<dyn BrokerClient>,
    settings: Arc<SettingsStore>,
    factory: ActorFactory,
    slot: Mutex<Option<JoinHandle<()>>>,
    supervisor_tx: mpsc::Sender<ControlMessage>,
    restart_delay: Duration,
}

impl Supervisor {
    pub fn new(
        state: Arc<EngineState>,
        broker: Arc<dyn BrokerClient>,
        settings: Arc<SettingsStore>,
        factory: ActorFactory,
    ) -> Self {
        let (supervisor_tx, supervisor_rx) = mpsc::channel::<ControlMessage>(512);
        tokio::spawn(Self::monitor(supervisor_rx));

        Self {
            state,
            broker,
            settings,
            factory,
            slot: Mutex::new(None),
            supervisor_tx,
            restart_delay: Duration::from_secs(2),
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn phase(&self) -> EnginePhase {
        self.state.phase()
    }

    /// Starts the execution loop unless one is already running. A loop that is
    /// still winding down from a previous stop is awaited first, so two
    /// dispatchers never share the queue.
    pub async fn start(&self) -> anyhow::Result<StartOutcome> {
        let mut slot = self.slot.lock().await;

        if self.state.is_running() {
            info!("Trade monitoring already running.");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if let Some(previous) = slot.take() {
            if !previous.is_finished() {
                info!("Waiting for the previous execution loop to exit...");
            }
            if let Err(e) = previous.await {
                error!("Previous execution loop ended abnormally: {}", e);
            }
        }

        let settings = self.settings.load().await?;
        if !self.state.try_begin() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        *slot = Some(self.spawn_actor(settings));
        info!("Trade monitoring started.");
        Ok(StartOutcome::Started)
    }

    /// Raises the cancellation flag, then flattens the account. Brokerage
    /// failures are logged and reported but never fail the stop.
    ///
    /// The flag is raised under the slot lock, so a start that is still
    /// waiting on the previous loop finishes first and is then stopped.
    pub async fn stop(&self) -> StopOutcome {
        let previous = {
            let _slot = self.slot.lock().await;
            self.state.request_stop()
        };
        info!("Trade monitoring stopping (was {}).", previous);

        let cancelled_orders = match self.broker.cancel_all_orders().await {
            Ok(count) => {
                info!("Cancelled {} open orders.", count);
                Some(count)
            }
            Err(e) => {
                error!("An error occurred while canceling orders: {}", e);
                None
            }
        };

        let flatten = match self.broker.close_all_positions().await {
            Ok(report) => {
                info!("Closed {} positions.", report.closed.len());
                if !report.is_complete() {
                    for (symbol, reason) in &report.failed {
                        warn!("Could not close {}: {}", symbol, reason);
                    }
                }
                Some(report)
            }
            Err(e) => {
                error!("Failed to close all positions: {}", e);
                None
            }
        };

        info!("Trade monitoring stopped.");
        StopOutcome {
            previous,
            cancelled_orders,
            flatten,
        }
    }

    /// Runs fresh actors until a stop is requested. An actor that returns an
    /// error while the engine should still be running is replaced.
    fn spawn_actor(&self, settings: TradingSettings) -> JoinHandle<()> {
        let factory = self.factory.clone();
        let state = self.state.clone();
        let tx = self.supervisor_tx.clone();
        let restart_delay = self.restart_delay;

        tokio::spawn(async move {
            loop {
                let mut actor = factory(settings);
                let actor_type = actor.name();

                match actor.run(tx.clone()).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!("Actor {:?} crashed: {}", actor_type, e);
                        let _ = tx.send(ControlMessage::Error(actor.id(), e.to_string())).await;
                        time::sleep(restart_delay).await;
                        if !state.is_running() {
                            break;
                        }
                        warn!("Restarting {:?}", actor_type);
                    }
                }
            }

            if !state.settle() {
                state.reset();
            }
        })
    }

    async fn monitor(mut supervisor_rx: mpsc::Receiver<ControlMessage>) {
        while let Some(msg) = supervisor_rx.recv().await {
            match msg {
                ControlMessage::Started(id) => info!("Actor {} is up.", id),
                ControlMessage::Shutdown(id) => warn!("Actor {} is shutting down gracefully.", id),
                ControlMessage::Error(id, error_msg) => {
                    error!("Actor {} reported error: {}", id, error_msg)
                }
            }
        }
    }
}
