use thiserror::Error;

/// Failure taxonomy shared by the engine, the brokerage client and the queue.
///
/// The absence of a position is deliberately not represented here; see
/// [`crate::models::PositionLookup::Absent`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),
    #[error("Broker rejected request (HTTP {status}): {message}")]
    BrokerRejected { status: u16, message: String },
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl TradingError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Transient failures are worth retrying on a later cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BrokerUnavailable(_) | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TradingError::BrokerUnavailable("timeout".into()).is_transient());
        assert!(TradingError::Storage("locked".into()).is_transient());
        assert!(!TradingError::invalid("qty").is_transient());
        assert!(!TradingError::Unauthorized.is_transient());
        assert!(
            !TradingError::BrokerRejected {
                status: 422,
                message: "insufficient buying power".into()
            }
            .is_transient()
        );
    }
}
