use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::TradingError;
use common::actors::{Actor, ActorType, ControlMessage};
use common::models::{OrderSpec, PositionSide, Signal, SubmittedOrder, TradingSettings};
use common::traits::{BrokerClient, SignalQueue};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{BATCH_SIZE, EngineTiming};
use crate::services::position_resolver::{Resolution, resolve_position};
use crate::services::position_sizer::{PositionSize, determine_position_size};
use crate::state::EngineState;

/// Everything the dispatcher needs, injected rather than global.
#[derive(Clone)]
pub struct EngineContext {
    pub broker: Arc<dyn BrokerClient>,
    pub queue: Arc<dyn SignalQueue>,
    pub state: Arc<EngineState>,
    pub timing: EngineTiming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    PositionUnknown(TradingError),
    CloseFailed(TradingError),
    SizeUnknown(TradingError),
    ZeroSize,
    InvalidOrder(TradingError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Submitted(SubmittedOrder),
    Skipped(SkipReason),
    SubmitFailed(TradingError),
}

/// Polls the signal queue and turns each signal into at most one order.
pub struct ExecutionService {
    id: Uuid,
    ctx: EngineContext,
    settings: TradingSettings,
    /// Advisory only; the brokerage position is authoritative.
    held_sides: HashMap<String, PositionSide>,
    notification_tx: Option<broadcast::Sender<String>>,
}

#[async_trait]
impl Actor for ExecutionService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::ExecutionActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        info!(
            "Starting Execution Service (order_type={}, time_in_force={})",
            self.settings.order_type, self.settings.time_in_force
        );
        let _ = supervisor_tx.send(ControlMessage::Started(self.id)).await;

        while self.ctx.state.is_running() {
            match self.run_cycle().await {
                Ok(processed) => {
                    if processed > 0 {
                        debug!("Processed {} signals", processed);
                    }
                    time::sleep(self.ctx.timing.poll_interval).await;
                }
                Err(e) => {
                    error!("An error occurred while monitoring signals: {}", e);
                    let _ = supervisor_tx
                        .send(ControlMessage::Error(
                            self.id,
                            format!("Signal batch fetch failed: {}", e),
                        ))
                        .await;
                    time::sleep(self.ctx.timing.error_backoff).await;
                }
            }
        }

        info!("Execution loop stopped.");
        let _ = supervisor_tx.send(ControlMessage::Shutdown(self.id)).await;
        Ok(())
    }
}

impl ExecutionService {
    pub fn new(ctx: EngineContext, settings: TradingSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            ctx,
            settings,
            held_sides: HashMap::new(),
            notification_tx: None,
        }
    }

    pub fn with_notifier(mut self, tx: broadcast::Sender<String>) -> Self {
        self.notification_tx = Some(tx);
        self
    }

    pub fn held_side(&self, symbol: &str) -> Option<PositionSide> {
        self.held_sides.get(symbol).copied()
    }

    /// One pass over the newest batch. Only a failed fetch is an error; every
    /// per-signal failure is logged and the signal is retired regardless.
    pub async fn run_cycle(&mut self) -> Result<usize, TradingError> {
        let signals = self.ctx.queue.find_most_recent(BATCH_SIZE).await?;

        let mut processed = 0;
        for signal in signals {
            if !self.ctx.state.is_running() {
                info!("Stop requested; leaving {} for the next run", signal.id);
                break;
            }

            let outcome = self.process_signal(&signal).await;
            self.log_outcome(&signal, &outcome);
            self.retire(&signal).await;
            processed += 1;
        }
        Ok(processed)
    }

    pub async fn process_signal(&mut self, signal: &Signal) -> SignalOutcome {
        let broker = self.ctx.broker.as_ref();

        // Checked before the resolver so a bad price can never close a position.
        if signal.order_price <= Decimal::ZERO {
            return SignalOutcome::Skipped(SkipReason::InvalidOrder(TradingError::invalid(format!(
                "order price must be positive, got {}",
                signal.order_price
            ))));
        }

        match resolve_position(broker, &signal.symbol, signal.action).await {
            Resolution::Clear => {}
            Resolution::ClosedOpposing(position) => {
                debug!("Closed {:?} {} before acting", position.side, position.symbol);
                self.held_sides.remove(&signal.symbol);
            }
            Resolution::Unresolved(e) => {
                return SignalOutcome::Skipped(SkipReason::PositionUnknown(e));
            }
            Resolution::CloseFailed(_, e) => {
                return SignalOutcome::Skipped(SkipReason::CloseFailed(e));
            }
        }

        let qty = match determine_position_size(broker, &signal.symbol, signal.order_price).await {
            Ok(PositionSize::Shares(0)) => return SignalOutcome::Skipped(SkipReason::ZeroSize),
            Ok(PositionSize::Shares(qty)) => qty,
            Ok(PositionSize::Unknown(e)) => {
                return SignalOutcome::Skipped(SkipReason::SizeUnknown(e));
            }
            Err(e) => return SignalOutcome::Skipped(SkipReason::InvalidOrder(e)),
        };

        let order = match OrderSpec::build(
            self.settings.order_type,
            &signal.symbol,
            qty,
            signal.action.order_side(),
            self.settings.time_in_force,
            Some(signal.order_price),
        ) {
            Ok(order) => order,
            Err(e) => return SignalOutcome::Skipped(SkipReason::InvalidOrder(e)),
        };

        match broker.submit_order(&order).await {
            Ok(submitted) => {
                self.held_sides
                    .insert(signal.symbol.clone(), signal.action.resulting_side());
                self.notify(format!(
                    "Executed {} order for {} x{} ({}, id {})",
                    signal.action, signal.symbol, qty, order.kind(), submitted.id
                ));
                SignalOutcome::Submitted(submitted)
            }
            Err(e) => SignalOutcome::SubmitFailed(e),
        }
    }

    async fn retire(&self, signal: &Signal) {
        match self.ctx.queue.delete(signal.id).await {
            Ok(true) => {}
            Ok(false) => warn!("Signal {} was already removed", signal.id),
            Err(e) => error!("Failed to delete signal {}: {}", signal.id, e),
        }
    }

    fn notify(&self, message: String) {
        if let Some(tx) = &self.notification_tx {
            let _ = tx.send(message);
        }
    }

    fn log_outcome(&self, signal: &Signal, outcome: &SignalOutcome) {
        match outcome {
            SignalOutcome::Submitted(order) => info!(
                "Executed {} order for {} (order {}, status {}). Held: {:?}",
                signal.action,
                signal.symbol,
                order.id,
                order.status,
                self.held_side(&signal.symbol)
            ),
            SignalOutcome::Skipped(SkipReason::ZeroSize) => warn!(
                "Invalid position size for {} {} at {}. Skipping.",
                signal.action, signal.symbol, signal.order_price
            ),
            SignalOutcome::Skipped(reason) => {
                warn!("Skipping {} signal for {}: {:?}", signal.action, signal.symbol, reason)
            }
            SignalOutcome::SubmitFailed(e) if e.is_transient() => warn!(
                "ORDER FAILED for {} {}, brokerage unreachable: {}",
                signal.action, signal.symbol, e
            ),
            SignalOutcome::SubmitFailed(e) => {
                error!("ORDER FAILED for {} {}: {}", signal.action, signal.symbol, e)
            }
        }
    }
}
