use chrono::{DateTime, Utc};
use common::TradingError;
use common::models::{BalancePoint, FillActivity};
use serde::Deserialize;

use crate::traits::RemoteResponse;

/// Account activity entry. Only fills carry the order fields.
#[derive(Debug, Deserialize)]
pub struct ActivityResponse {
    pub activity_type: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(rename = "type", default)]
    pub fill_type: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub qty: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<DateTime<Utc>>,
}

impl ActivityResponse {
    pub fn is_fill(&self) -> bool {
        self.activity_type == "FILL"
    }
}

impl RemoteResponse<FillActivity> for ActivityResponse {
    fn to_domain(&self) -> Result<FillActivity, TradingError> {
        let transaction_time = self.transaction_time.ok_or_else(|| {
            TradingError::BrokerUnavailable("fill activity without transaction_time".into())
        })?;

        Ok(FillActivity {
            asset: self.symbol.clone().unwrap_or_default(),
            side: self.side.clone().unwrap_or_default(),
            fill_type: self.fill_type.clone().unwrap_or_default(),
            status: self.order_status.clone().unwrap_or_default(),
            quantity: self.qty.clone().unwrap_or_default(),
            submitted: transaction_time,
            filled_at: transaction_time,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PortfolioHistoryResponse {
    pub timestamp: Vec<i64>,
    pub equity: Vec<Option<f64>>,
    pub profit_loss: Vec<Option<f64>>,
    pub profit_loss_pct: Vec<Option<f64>>,
}

impl RemoteResponse<Vec<BalancePoint>> for PortfolioHistoryResponse {
    /// Newest first.
    fn to_domain(&self) -> Result<Vec<BalancePoint>, TradingError> {
        let mut points = Vec::with_capacity(self.timestamp.len());

        for (i, &ts) in self.timestamp.iter().enumerate() {
            let time = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
                TradingError::BrokerUnavailable(format!("invalid history timestamp {ts}"))
            })?;

            points.push(BalancePoint {
                timestamp: time.format("%Y-%m-%d %H:%M:%S").to_string(),
                equity: self.equity.get(i).copied().flatten(),
                profit_loss: self.profit_loss.get(i).copied().flatten(),
                profit_loss_pct: self.profit_loss_pct.get(i).copied().flatten(),
            });
        }

        points.reverse();
        Ok(points)
    }
}
