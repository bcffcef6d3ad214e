use common::TradingError;

/// Converts a raw brokerage payload into its domain model.
pub trait RemoteResponse<T> {
    fn to_domain(&self) -> Result<T, TradingError>;
}
