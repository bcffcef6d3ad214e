use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub portfolio_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub id: String,
    pub status: String,
}

/// Per-symbol results of a flatten-all request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseAllReport {
    pub closed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl CloseAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A filled order, as shown in the activity view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillActivity {
    pub asset: String,
    pub side: String,
    #[serde(rename = "type")]
    pub fill_type: String,
    pub status: String,
    pub quantity: String,
    pub submitted: DateTime<Utc>,
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub timestamp: String,
    pub equity: Option<f64>,
    pub profit_loss: Option<f64>,
    pub profit_loss_pct: Option<f64>,
}
