use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use super::{Ack, ApiError, AppState};
use crate::actors::supervisor::StartOutcome;
use crate::state::EnginePhase;

#[derive(Debug, Serialize)]
pub struct PhaseDetail {
    pub phase: EnginePhase,
}

#[derive(Debug, Serialize)]
pub struct StopDetail {
    pub phase: EnginePhase,
    pub cancelled_orders: Option<usize>,
    pub closed_positions: Vec<String>,
    pub failed_positions: Vec<String>,
}

pub async fn start_trade(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Ack<PhaseDetail>>, ApiError> {
    let outcome = state.supervisor.start().await.map_err(|e| {
        error!("Could not start trade monitoring: {:#}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })?;

    let message = match outcome {
        StartOutcome::Started => "Trade monitoring started",
        StartOutcome::AlreadyRunning => "Trade monitoring already running",
    };
    Ok(Json(Ack::success(
        message,
        PhaseDetail {
            phase: state.supervisor.phase(),
        },
    )))
}

/// Always succeeds; flattening failures are reported in the body.
pub async fn stop_trade(State(state): State<Arc<AppState>>) -> Json<Ack<StopDetail>> {
    let outcome = state.supervisor.stop().await;
    let (closed_positions, failed_positions) = match outcome.flatten {
        Some(report) => (
            report.closed,
            report.failed.into_iter().map(|(symbol, _)| symbol).collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    Json(Ack::success(
        "Trade monitoring stopped",
        StopDetail {
            phase: state.supervisor.phase(),
            cancelled_orders: outcome.cancelled_orders,
            closed_positions,
            failed_positions,
        },
    ))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<PhaseDetail> {
    Json(PhaseDetail {
        phase: state.supervisor.phase(),
    })
}
