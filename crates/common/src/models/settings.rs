use serde::{Deserialize, Serialize};

use crate::models::{OrderKind, TimeInForce};

/// Trading preferences applied to every order the engine builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSettings {
    #[serde(rename = "orderType", alias = "order_type")]
    pub order_type: OrderKind,
    #[serde(rename = "timeInForce", alias = "time_in_force")]
    pub time_in_force: TimeInForce,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            order_type: OrderKind::Market,
            time_in_force: TimeInForce::Day,
        }
    }
}
