use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::TradingError;
use crate::models::{
    Account, BalancePoint, CloseAllReport, FillActivity, NewSignal, OrderSpec, PositionLookup,
    Signal, SubmittedOrder,
};

/// Brokerage operations the engine depends on. Every call is a network round
/// trip and may fail transiently.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn get_account(&self) -> Result<Account, TradingError>;

    async fn get_open_position(&self, symbol: &str) -> PositionLookup;

    async fn submit_order(&self, order: &OrderSpec) -> Result<SubmittedOrder, TradingError>;

    async fn close_position(&self, symbol: &str, qty: Decimal)
    -> Result<SubmittedOrder, TradingError>;

    async fn close_all_positions(&self) -> Result<CloseAllReport, TradingError>;

    /// Returns how many open orders were cancelled.
    async fn cancel_all_orders(&self) -> Result<usize, TradingError>;

    async fn list_activities(&self) -> Result<Vec<FillActivity>, TradingError>;

    async fn list_portfolio_history(&self) -> Result<Vec<BalancePoint>, TradingError>;
}

/// Durable queue of webhook signals waiting to be turned into orders.
#[async_trait]
pub trait SignalQueue: Send + Sync {
    async fn insert(&self, signal: NewSignal) -> Result<Signal, TradingError>;

    /// Newest first.
    async fn find_most_recent(&self, limit: u32) -> Result<Vec<Signal>, TradingError>;

    /// Returns false when the id was already gone.
    async fn delete(&self, id: i64) -> Result<bool, TradingError>;

    async fn delete_all(&self) -> Result<u64, TradingError>;
}
