use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use common::models::{BalancePoint, FillActivity, OrderKind, TimeInForce, TradingSettings};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{Ack, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(alias = "orderType")]
    pub order_type: String,
    #[serde(alias = "timeInForce")]
    pub time_in_force: String,
}

#[derive(Debug, Serialize)]
pub struct SettingsDetail {
    pub settings: TradingSettings,
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub closed_orders: Vec<FillActivity>,
    pub balance_data: Vec<BalancePoint>,
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TradingSettings>, ApiError> {
    let settings = state
        .settings
        .load()
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(settings))
}

/// Persists new preferences. A running loop keeps its settings until the
/// next start.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    request: Result<Json<SettingsRequest>, JsonRejection>,
) -> Result<Json<Ack<SettingsDetail>>, ApiError> {
    let Json(request) =
        request.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;

    let settings = TradingSettings {
        order_type: request.order_type.parse::<OrderKind>()?,
        time_in_force: request.time_in_force.parse::<TimeInForce>()?,
    };

    state.settings.save(&settings).await.map_err(|e| {
        error!("Failed to save settings: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(Ack::success(
        "Settings saved",
        SettingsDetail { settings },
    )))
}

/// Fills and balance history, newest first. Either half degrades to an
/// empty list when the brokerage cannot be reached.
pub async fn activity(State(state): State<Arc<AppState>>) -> Json<ActivityView> {
    let (activities, history) = tokio::join!(
        state.broker.list_activities(),
        state.broker.list_portfolio_history()
    );

    let closed_orders = activities.unwrap_or_else(|e| {
        error!("An error occurred while fetching activities: {}", e);
        Vec::new()
    });
    let balance_data = history.unwrap_or_else(|e| {
        error!("An error occurred while fetching portfolio history: {}", e);
        Vec::new()
    });

    info!(
        "Activity view: {} fills, {} balance points",
        closed_orders.len(),
        balance_data.len()
    );
    Json(ActivityView {
        closed_orders,
        balance_data,
    })
}
