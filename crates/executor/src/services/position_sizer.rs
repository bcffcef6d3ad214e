use common::TradingError;
use common::traits::BrokerClient;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use tracing::warn;

/// Largest share of portfolio value committed to a single order.
pub const MAX_TRADE_FRACTION: Decimal = dec!(0.20);
/// Hard cap on shares per order.
pub const MAX_POSITION_SIZE: u64 = 100;

/// Result of sizing a signal. `Shares(0)` is a valid answer and means skip;
/// `Unknown` means the account could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionSize {
    Shares(u64),
    Unknown(TradingError),
}

pub fn compute_position_size(portfolio_value: Decimal, order_price: Decimal) -> u64 {
    let max_trade_amount = portfolio_value * MAX_TRADE_FRACTION;
    if max_trade_amount <= Decimal::ZERO {
        return 0;
    }

    let cap = Decimal::from(MAX_POSITION_SIZE);
    let max_quantity_by_value = match max_trade_amount.checked_div(order_price) {
        Some(quantity) => quantity.floor(),
        // Only overflows for absurdly small prices, which the cap covers anyway.
        None => cap,
    };

    max_quantity_by_value.min(cap).to_u64().unwrap_or(0)
}

pub async fn determine_position_size(
    broker: &dyn BrokerClient,
    symbol: &str,
    order_price: Decimal,
) -> Result<PositionSize, TradingError> {
    if order_price <= Decimal::ZERO {
        return Err(TradingError::invalid(format!(
            "order price must be greater than zero, got {order_price} for {symbol}"
        )));
    }

    match broker.get_account().await {
        Ok(account) => Ok(PositionSize::Shares(compute_position_size(
            account.portfolio_value,
            order_price,
        ))),
        Err(e) => {
            warn!("Could not size position for {}: {}", symbol, e);
            Ok(PositionSize::Unknown(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBroker;
    use common::models::Account;

    fn broker_with_value(value: Decimal) -> MockBroker {
        let mut broker = MockBroker::new();
        broker.expect_get_account().returning(move || {
            Ok(Account {
                portfolio_value: value,
            })
        });
        broker
    }

    #[test]
    fn test_twenty_percent_of_portfolio() {
        assert_eq!(compute_position_size(dec!(1000), dec!(5)), 40);
        assert_eq!(compute_position_size(dec!(10000), dec!(150)), 13);
    }

    #[test]
    fn test_capped_at_one_hundred_shares() {
        assert_eq!(compute_position_size(dec!(100000), dec!(1)), 100);
    }

    #[test]
    fn test_small_portfolio_sizes_to_zero() {
        assert_eq!(compute_position_size(dec!(100), dec!(150)), 0);
        assert_eq!(compute_position_size(dec!(0), dec!(10)), 0);
        assert_eq!(compute_position_size(dec!(-500), dec!(10)), 0);
    }

    #[test]
    fn test_tiny_price_does_not_overflow() {
        assert_eq!(
            compute_position_size(Decimal::MAX, dec!(0.0000000000000000000000000001)),
            100
        );
    }

    #[tokio::test]
    async fn test_sizes_against_account_value() {
        let broker = broker_with_value(dec!(10000));
        let size = determine_position_size(&broker, "AAPL", dec!(150))
            .await
            .unwrap();
        assert_eq!(size, PositionSize::Shares(13));
    }

    #[tokio::test]
    async fn test_non_positive_price_is_invalid() {
        for price in [dec!(0), dec!(-1), dec!(-0.01)] {
            let mut broker = MockBroker::new();
            broker.expect_get_account().times(0);

            let result = determine_position_size(&broker, "AAPL", price).await;
            assert!(
                matches!(result, Err(TradingError::InvalidRequest(_))),
                "price {price} must be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_unknown_not_zero() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_account()
            .returning(|| Err(TradingError::BrokerUnavailable("connection reset".into())));

        let size = determine_position_size(&broker, "AAPL", dec!(150))
            .await
            .unwrap();
        assert!(matches!(size, PositionSize::Unknown(_)));
        assert_ne!(size, PositionSize::Shares(0));
    }
}
