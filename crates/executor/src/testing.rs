//! Test doubles for the brokerage and the signal queue.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::TradingError;
use common::models::{
    Account, BalancePoint, CloseAllReport, FillActivity, NewSignal, OrderSpec, PositionLookup,
    Signal, SignalAction, SubmittedOrder,
};
use common::traits::{BrokerClient, SignalQueue};
use mockall::mock;
use rust_decimal::Decimal;

mock! {
    pub Broker {}

    #[async_trait]
    impl BrokerClient for Broker {
        async fn get_account(&self) -> Result<Account, TradingError>;
        async fn get_open_position(&self, symbol: &str) -> PositionLookup;
        async fn submit_order(&self, order: &OrderSpec) -> Result<SubmittedOrder, TradingError>;
        async fn close_position(&self, symbol: &str, qty: Decimal) -> Result<SubmittedOrder, TradingError>;
        async fn close_all_positions(&self) -> Result<CloseAllReport, TradingError>;
        async fn cancel_all_orders(&self) -> Result<usize, TradingError>;
        async fn list_activities(&self) -> Result<Vec<FillActivity>, TradingError>;
        async fn list_portfolio_history(&self) -> Result<Vec<BalancePoint>, TradingError>;
    }
}

pub fn accepted(id: &str) -> SubmittedOrder {
    SubmittedOrder {
        id: id.to_string(),
        status: "accepted".to_string(),
    }
}

/// In-memory queue that records how it is used.
///
/// `max_concurrent_drains` captures overlapping `find_most_recent` calls, which
/// only happen when two dispatchers share the queue.
#[derive(Default)]
pub struct FakeQueue {
    signals: Mutex<Vec<Signal>>,
    next_id: AtomicI64,
    drain_delay: Duration,
    failing_fetches: AtomicUsize,
    fail_inserts: bool,
    active_drains: AtomicUsize,
    pub drains: AtomicUsize,
    pub max_concurrent_drains: AtomicUsize,
    pub inserts: AtomicUsize,
    pub deleted: Mutex<Vec<i64>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drain_delay(mut self, delay: Duration) -> Self {
        self.drain_delay = delay;
        self
    }

    pub fn failing_fetches(self, count: usize) -> Self {
        self.failing_fetches.store(count, Ordering::SeqCst);
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn push(&self, symbol: &str, action: SignalAction, price: Decimal) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.signals.lock().unwrap().push(Signal {
            id,
            symbol: symbol.to_string(),
            action,
            order_price: price,
            received_at: Utc::now(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.signals.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SignalQueue for FakeQueue {
    async fn insert(&self, signal: NewSignal) -> Result<Signal, TradingError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(TradingError::Storage("database is locked".into()));
        }
        let id = self.push(&signal.symbol, signal.action, signal.order_price);
        let signals = self.signals.lock().unwrap();
        Ok(signals.iter().find(|s| s.id == id).cloned().unwrap())
    }

    async fn find_most_recent(&self, limit: u32) -> Result<Vec<Signal>, TradingError> {
        self.drains.fetch_add(1, Ordering::SeqCst);
        let active = self.active_drains.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_drains.fetch_max(active, Ordering::SeqCst);

        if !self.drain_delay.is_zero() {
            tokio::time::sleep(self.drain_delay).await;
        }
        self.active_drains.fetch_sub(1, Ordering::SeqCst);

        let should_fail = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TradingError::Storage("disk I/O error".into()));
        }

        let signals = self.signals.lock().unwrap();
        Ok(signals.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, TradingError> {
        self.deleted.lock().unwrap().push(id);
        let mut signals = self.signals.lock().unwrap();
        let before = signals.len();
        signals.retain(|s| s.id != id);
        Ok(signals.len() < before)
    }

    async fn delete_all(&self) -> Result<u64, TradingError> {
        let mut signals = self.signals.lock().unwrap();
        let removed = signals.len() as u64;
        signals.clear();
        Ok(removed)
    }
}
