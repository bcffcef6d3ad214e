use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::models::{OrderSide, PositionSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    pub fn order_side(&self) -> OrderSide {
        match self {
            Self::Buy => OrderSide::Buy,
            Self::Sell => OrderSide::Sell,
        }
    }

    /// Side we expect to be holding once an order for this action fills.
    pub fn resulting_side(&self) -> PositionSide {
        match self {
            Self::Buy => PositionSide::Long,
            Self::Sell => PositionSide::Short,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalAction {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(TradingError::invalid(format!("unknown order action '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayload {
    pub order_action: SignalAction,
    #[serde(with = "rust_decimal::serde::float")]
    pub order_price: Decimal,
}

/// Document posted by the strategy to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub ticker: String,
    pub strategy: StrategyPayload,
    pub passphrase: String,
}

impl WebhookPayload {
    pub fn into_new_signal(self) -> NewSignal {
        NewSignal {
            symbol: self.ticker,
            action: self.strategy.order_action,
            order_price: self.strategy.order_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSignal {
    pub symbol: String,
    pub action: SignalAction,
    pub order_price: Decimal,
}

/// A queued signal. `id` is the handle used to retire it once processed.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: i64,
    pub symbol: String,
    pub action: SignalAction,
    pub order_price: Decimal,
    pub received_at: DateTime<Utc>,
}

/// Wire rendering of a stored signal, ids as strings.
#[derive(Debug, Clone, Serialize)]
pub struct SignalDocument {
    pub id: String,
    pub ticker: String,
    pub strategy: StrategyPayload,
    pub received_at: DateTime<Utc>,
}

impl From<&Signal> for SignalDocument {
    fn from(signal: &Signal) -> Self {
        Self {
            id: signal.id.to_string(),
            ticker: signal.symbol.clone(),
            strategy: StrategyPayload {
                order_action: signal.action,
                order_price: signal.order_price,
            },
            received_at: signal.received_at,
        }
    }
}
