use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::TradingError;

/// Share of the notional value kept as a stop-loss buffer on stop-limit orders.
pub const STOP_LOSS_FRACTION: Decimal = dec!(0.10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Opg,
    Cls,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
            Self::Opg => "opg",
            Self::Cls => "cls",
            Self::Ioc => "ioc",
            Self::Fok => "fok",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInForce {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "gtc" => Ok(Self::Gtc),
            "opg" => Ok(Self::Opg),
            "cls" => Ok(Self::Cls),
            "ioc" => Ok(Self::Ioc),
            "fok" => Ok(Self::Fok),
            other => Err(TradingError::invalid(format!(
                "invalid time in force '{other}'"
            ))),
        }
    }
}

/// The order flavour selected in the trading settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    #[serde(rename = "market_order", alias = "market")]
    Market,
    #[serde(rename = "limit_order", alias = "limit")]
    Limit,
    #[serde(rename = "stop_loss_limit_order", alias = "stop_limit")]
    StopLimit,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market_order",
            Self::Limit => "limit_order",
            Self::StopLimit => "stop_loss_limit_order",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market_order" | "market" => Ok(Self::Market),
            "limit_order" | "limit" => Ok(Self::Limit),
            "stop_loss_limit_order" | "stop_limit" => Ok(Self::StopLimit),
            other => Err(TradingError::invalid(format!(
                "invalid order type '{other}'"
            ))),
        }
    }
}

/// Order type together with the prices it carries. A limit price can only
/// exist on the variants that need one, and the stop price is always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit { limit_price: Decimal },
    StopLimit { limit_price: Decimal, stop_price: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub symbol: String,
    pub qty: u64,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
    pub order_type: OrderType,
}

impl OrderSpec {
    /// Builds a validated order request. Pure; no broker interaction.
    pub fn build(
        kind: OrderKind,
        symbol: &str,
        qty: u64,
        side: OrderSide,
        time_in_force: TimeInForce,
        limit_price: Option<Decimal>,
    ) -> Result<Self, TradingError> {
        if symbol.trim().is_empty() {
            return Err(TradingError::invalid("symbol must not be empty"));
        }
        if qty == 0 {
            return Err(TradingError::invalid("quantity must be greater than zero"));
        }

        let order_type = match kind {
            OrderKind::Market => OrderType::Market,
            OrderKind::Limit => OrderType::Limit {
                limit_price: require_limit_price(kind, limit_price)?,
            },
            OrderKind::StopLimit => {
                let limit_price = require_limit_price(kind, limit_price)?;
                OrderType::StopLimit {
                    limit_price,
                    stop_price: calculate_stop_price(limit_price, qty),
                }
            }
        };

        Ok(Self {
            symbol: symbol.to_string(),
            qty,
            side,
            time_in_force,
            order_type,
        })
    }

    pub fn kind(&self) -> OrderKind {
        match self.order_type {
            OrderType::Market => OrderKind::Market,
            OrderType::Limit { .. } => OrderKind::Limit,
            OrderType::StopLimit { .. } => OrderKind::StopLimit,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self.order_type {
            OrderType::Market => None,
            OrderType::Limit { limit_price } | OrderType::StopLimit { limit_price, .. } => {
                Some(limit_price)
            }
        }
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        match self.order_type {
            OrderType::StopLimit { stop_price, .. } => Some(stop_price),
            _ => None,
        }
    }
}

fn require_limit_price(kind: OrderKind, limit_price: Option<Decimal>) -> Result<Decimal, TradingError> {
    match limit_price {
        Some(price) if price > Decimal::ZERO => Ok(price),
        Some(price) => Err(TradingError::invalid(format!(
            "limit price must be positive for {kind}, got {price}"
        ))),
        None => Err(TradingError::invalid(format!(
            "limit price is required for {kind}"
        ))),
    }
}

/// Stop price sitting 10% of the order's notional value below the limit,
/// expressed per share. Callers guarantee `qty > 0`.
pub fn calculate_stop_price(limit_price: Decimal, qty: u64) -> Decimal {
    let qty = Decimal::from(qty);
    let notional = limit_price * qty;
    limit_price - (notional * STOP_LOSS_FRACTION) / qty
}
