use common::TradingError;
use common::models::Account;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::traits::RemoteResponse;

#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    pub portfolio_value: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub trading_blocked: bool,
}

impl RemoteResponse<Account> for AccountResponse {
    fn to_domain(&self) -> Result<Account, TradingError> {
        Ok(Account {
            portfolio_value: self.portfolio_value,
        })
    }
}
