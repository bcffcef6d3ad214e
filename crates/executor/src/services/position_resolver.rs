use common::TradingError;
use common::models::{Position, PositionLookup, SignalAction};
use common::traits::BrokerClient;
use tracing::{info, warn};

/// What the resolver found before an order for a signal may go out.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Flat, or already holding the side the signal asks for.
    Clear,
    /// An opposing position existed and was closed.
    ClosedOpposing(Position),
    /// The position could not be observed.
    Unresolved(TradingError),
    /// An opposing position exists but closing it failed.
    CloseFailed(Position, TradingError),
}

impl Resolution {
    pub fn may_proceed(&self) -> bool {
        matches!(self, Self::Clear | Self::ClosedOpposing(_))
    }
}

pub async fn resolve_position(
    broker: &dyn BrokerClient,
    symbol: &str,
    action: SignalAction,
) -> Resolution {
    let position = match broker.get_open_position(symbol).await {
        PositionLookup::Absent => return Resolution::Clear,
        PositionLookup::Failed(e) => {
            warn!("Could not read open position for {}: {}", symbol, e);
            return Resolution::Unresolved(e);
        }
        PositionLookup::Found(position) => position,
    };

    if !position.side.opposes(action) {
        return Resolution::Clear;
    }

    info!(
        "{} signal for {} while holding {:?} {}; closing first",
        action, symbol, position.side, position.qty
    );
    match broker.close_position(symbol, position.qty).await {
        Ok(_) => Resolution::ClosedOpposing(position),
        Err(e) => {
            warn!("Failed to close {:?} position in {}: {}", position.side, symbol, e);
            Resolution::CloseFailed(position, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBroker;
    use common::models::{PositionSide, SubmittedOrder};
    use rust_decimal_macros::dec;

    fn position(side: PositionSide) -> Position {
        Position {
            symbol: "AAPL".into(),
            side,
            qty: dec!(7),
        }
    }

    #[tokio::test]
    async fn test_flat_symbol_is_clear() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_open_position()
            .withf(|symbol| symbol == "AAPL")
            .returning(|_| PositionLookup::Absent);
        broker.expect_close_position().times(0);

        let resolution = resolve_position(&broker, "AAPL", SignalAction::Buy).await;
        assert_eq!(resolution, Resolution::Clear);
        assert!(resolution.may_proceed());
    }

    #[tokio::test]
    async fn test_same_side_is_clear() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_open_position()
            .returning(|_| PositionLookup::Found(position(PositionSide::Long)));
        broker.expect_close_position().times(0);

        let resolution = resolve_position(&broker, "AAPL", SignalAction::Buy).await;
        assert_eq!(resolution, Resolution::Clear);
    }

    #[tokio::test]
    async fn test_opposing_position_is_closed_first() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_open_position()
            .returning(|_| PositionLookup::Found(position(PositionSide::Short)));
        broker
            .expect_close_position()
            .withf(|symbol, qty| symbol == "AAPL" && *qty == dec!(7))
            .times(1)
            .returning(|_, _| {
                Ok(SubmittedOrder {
                    id: "close".into(),
                    status: "accepted".into(),
                })
            });

        let resolution = resolve_position(&broker, "AAPL", SignalAction::Buy).await;
        assert_eq!(
            resolution,
            Resolution::ClosedOpposing(position(PositionSide::Short))
        );
        assert!(resolution.may_proceed());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_never_treated_as_flat() {
        let mut broker = MockBroker::new();
        broker.expect_get_open_position().returning(|_| {
            PositionLookup::Failed(TradingError::BrokerUnavailable("timeout".into()))
        });
        broker.expect_close_position().times(0);

        let resolution = resolve_position(&broker, "AAPL", SignalAction::Sell).await;
        assert!(matches!(resolution, Resolution::Unresolved(_)));
        assert!(!resolution.may_proceed());
    }

    #[tokio::test]
    async fn test_close_failure_blocks_the_signal() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_open_position()
            .returning(|_| PositionLookup::Found(position(PositionSide::Long)));
        broker
            .expect_close_position()
            .returning(|_, _| Err(TradingError::BrokerUnavailable("503".into())));

        let resolution = resolve_position(&broker, "AAPL", SignalAction::Sell).await;
        assert!(matches!(resolution, Resolution::CloseFailed(_, _)));
        assert!(!resolution.may_proceed());
    }
}
