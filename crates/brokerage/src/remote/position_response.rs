use common::TradingError;
use common::models::{Position, PositionSide};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::traits::RemoteResponse;

#[derive(Debug, Deserialize)]
pub struct PositionResponse {
    pub symbol: String,
    pub qty: Decimal,
    pub side: String,
}

impl RemoteResponse<Position> for PositionResponse {
    fn to_domain(&self) -> Result<Position, TradingError> {
        let side = match self.side.as_str() {
            "long" => PositionSide::Long,
            "short" => PositionSide::Short,
            other => {
                return Err(TradingError::BrokerUnavailable(format!(
                    "unexpected position side '{other}' for {}",
                    self.symbol
                )));
            }
        };

        Ok(Position {
            symbol: self.symbol.clone(),
            side,
            // Short quantities are reported negative.
            qty: self.qty.abs(),
        })
    }
}

/// One entry of the multi-status body returned when closing every position.
#[derive(Debug, Deserialize)]
pub struct ClosePositionResult {
    pub symbol: String,
    pub status: u16,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl ClosePositionResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn failure_message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}
