use common::TradingError;
use common::models::{OrderSpec, OrderType, SubmittedOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::traits::RemoteResponse;

/// JSON body for `POST /v2/orders`. Quantities and prices travel as strings.
#[derive(Debug, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
}

impl From<&OrderSpec> for OrderRequest {
    fn from(spec: &OrderSpec) -> Self {
        let order_type = match spec.order_type {
            OrderType::Market => "market",
            OrderType::Limit { .. } => "limit",
            OrderType::StopLimit { .. } => "stop_limit",
        };

        Self {
            symbol: spec.symbol.clone(),
            qty: spec.qty.to_string(),
            side: spec.side.as_str(),
            order_type,
            time_in_force: spec.time_in_force.as_str(),
            limit_price: spec.limit_price().map(wire_price),
            stop_price: spec.stop_price().map(wire_price),
        }
    }
}

/// Alpaca accepts cents at or above $1 and four decimals below it.
fn wire_price(price: Decimal) -> String {
    let dp = if price < Decimal::ONE { 4 } else { 2 };
    price.round_dp(dp).normalize().to_string()
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl RemoteResponse<SubmittedOrder> for OrderResponse {
    fn to_domain(&self) -> Result<SubmittedOrder, TradingError> {
        Ok(SubmittedOrder {
            id: self.id.clone(),
            status: self.status.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderResult {
    pub id: String,
    pub status: u16,
}
