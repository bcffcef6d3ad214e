use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradingError;
use crate::models::SignalAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// True when acting on `action` would trade against this holding.
    pub fn opposes(&self, action: SignalAction) -> bool {
        *self != action.resulting_side()
    }
}

/// Open position as reported by the brokerage. Read-only to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub qty: Decimal,
}

/// Outcome of asking the brokerage for a symbol's open position.
///
/// `Absent` is the ordinary answer for a flat symbol. `Failed` means we could
/// not observe the real state and must not act as if flat.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionLookup {
    Found(Position),
    Absent,
    Failed(TradingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposing_sides() {
        assert!(PositionSide::Short.opposes(SignalAction::Buy));
        assert!(PositionSide::Long.opposes(SignalAction::Sell));
        assert!(!PositionSide::Long.opposes(SignalAction::Buy));
        assert!(!PositionSide::Short.opposes(SignalAction::Sell));
    }
}
