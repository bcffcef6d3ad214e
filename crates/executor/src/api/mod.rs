//! HTTP surface: the webhook intake plus the lifecycle, settings and
//! activity endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::TradingError;
use common::traits::{BrokerClient, SignalQueue};
use serde::Serialize;
use storage::settings_store::SettingsStore;

use crate::actors::supervisor::Supervisor;

pub mod control;
pub mod dashboard;
pub mod webhook;

pub struct AppState {
    pub passphrase: String,
    pub queue: Arc<dyn SignalQueue>,
    pub supervisor: Arc<Supervisor>,
    pub broker: Arc<dyn BrokerClient>,
    pub settings: Arc<SettingsStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::receive_signal))
        .route("/start_trade", post(control::start_trade))
        .route("/stop_trade", post(control::stop_trade))
        .route("/status", get(control::status))
        .route(
            "/settings",
            get(dashboard::get_settings).post(dashboard::update_settings),
        )
        .route("/activity", get(dashboard::activity))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Error response rendered as `{"code":"error","message":...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<TradingError> for ApiError {
    fn from(err: TradingError) -> Self {
        let status = match &err {
            TradingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TradingError::Unauthorized => StatusCode::FORBIDDEN,
            TradingError::BrokerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TradingError::BrokerRejected { .. } => StatusCode::BAD_GATEWAY,
            TradingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: "error",
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Body shared by the endpoints that only acknowledge an action.
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub detail: T,
}

impl<T: Serialize> Ack<T> {
    pub fn success(message: impl Into<String>, detail: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            detail,
        }
    }
}
