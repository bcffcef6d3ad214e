use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use common::TradingError;
use common::models::{SignalDocument, WebhookPayload};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info, warn};

use super::{ApiError, AppState};

/// Queues a strategy signal. The passphrase is checked before anything is
/// persisted and is never stored.
pub async fn receive_signal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<SignalDocument>, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;

    if !passphrase_matches(&state.passphrase, &payload.passphrase) {
        warn!("Rejected webhook for {} with a bad passphrase", payload.ticker);
        return Err(TradingError::Unauthorized.into());
    }

    let signal = state
        .queue
        .insert(payload.into_new_signal())
        .await
        .map_err(|e| {
            error!("Failed to insert webhook message: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    info!(
        "Webhook message received: {} {} @ {} (id {})",
        signal.action, signal.symbol, signal.order_price, signal.id
    );
    Ok(Json(SignalDocument::from(&signal)))
}

type HmacSha256 = Hmac<Sha256>;

const PASSPHRASE_KEY: &[u8] = b"webhook-passphrase";

/// Compares MAC tags rather than the raw strings, so the check takes the same
/// time whatever prefix of the passphrase was guessed.
fn passphrase_matches(expected: &str, supplied: &str) -> bool {
    let tag = |input: &str| {
        HmacSha256::new_from_slice(PASSPHRASE_KEY).map(|mut mac| {
            mac.update(input.as_bytes());
            mac
        })
    };

    match (tag(expected), tag(supplied)) {
        (Ok(expected), Ok(supplied)) => supplied
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{PASSPHRASE, harness, send};
    use super::passphrase_matches;
    use crate::testing::{FakeQueue, MockBroker};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn signal_body(passphrase: &str) -> serde_json::Value {
        json!({
            "ticker": "AAPL",
            "strategy": { "order_action": "buy", "order_price": 150 },
            "passphrase": passphrase
        })
    }

    #[tokio::test]
    async fn test_accepted_signal_is_queued_and_echoed() {
        let h = harness(MockBroker::new(), FakeQueue::new());

        let (status, body) = send(&h.app, "POST", "/webhook", Some(signal_body(PASSPHRASE))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "1");
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["strategy"]["order_action"], "buy");
        assert!(body.get("passphrase").is_none());
        assert_eq!(h.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_never_reaches_the_queue() {
        let h = harness(MockBroker::new(), FakeQueue::new());

        let (status, body) = send(&h.app, "POST", "/webhook", Some(signal_body("guess"))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "code": "error", "message": "Unauthorized" }));
        assert_eq!(h.queue.inserts.load(Ordering::SeqCst), 0);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_a_server_error() {
        let h = harness(MockBroker::new(), FakeQueue::new().failing_inserts());

        let (status, body) = send(&h.app, "POST", "/webhook", Some(signal_body(PASSPHRASE))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "error");
        assert!(body["message"].as_str().unwrap().contains("database is locked"));
    }

    #[tokio::test]
    async fn test_malformed_signal_is_a_bad_request() {
        let h = harness(MockBroker::new(), FakeQueue::new());
        let body = json!({ "ticker": "AAPL", "passphrase": PASSPHRASE });

        let (status, body) = send(&h.app, "POST", "/webhook", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "error");
        assert_eq!(h.queue.inserts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_passphrase_comparison() {
        assert!(passphrase_matches(PASSPHRASE, PASSPHRASE));
        assert!(!passphrase_matches(PASSPHRASE, "somelongstring12"));
        assert!(!passphrase_matches(PASSPHRASE, "somelongstring1234"));
        assert!(!passphrase_matches(PASSPHRASE, ""));
        assert!(passphrase_matches("", ""));
    }
}
