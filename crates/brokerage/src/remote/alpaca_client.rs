use std::time::Duration;

use async_trait::async_trait;
use common::TradingError;
use common::models::{
    Account, BalancePoint, CloseAllReport, FillActivity, OrderSpec, PositionLookup, SubmittedOrder,
};
use common::traits::BrokerClient;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::remote::account_response::AccountResponse;
use crate::remote::activity_response::{ActivityResponse, PortfolioHistoryResponse};
use crate::remote::order_response::{CancelOrderResult, OrderRequest, OrderResponse};
use crate::remote::position_response::{ClosePositionResult, PositionResponse};
use crate::traits::RemoteResponse;

/// Error code Alpaca returns with a 404 when the account holds no position.
const POSITION_NOT_FOUND: u64 = 40410000;

#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
    /// Upper bound for every request, connect included.
    pub timeout: Duration,
}

/// REST client for the Alpaca trading API.
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl AlpacaClient {
    pub fn new(config: AlpacaConfig) -> Result<Self, TradingError> {
        let client = Client::builder()
            .user_agent("signal_trader/0.1.0")
            .timeout(config.timeout)
            .build()
            .map_err(|e| TradingError::BrokerUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            secret_key: config.secret_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authed(self.client.request(method, format!("{}{}", self.base_url, path)))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("accept", "application/json")
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    /// `/v2/positions/{symbol}` with the symbol encoded as one path segment.
    fn position_url(&self, symbol: &str) -> Result<Url, TradingError> {
        let mut url = Url::parse(&format!("{}/v2/positions", self.base_url))
            .map_err(|e| TradingError::invalid(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| TradingError::invalid(format!("base url {} cannot hold a path", self.base_url)))?
            .push(symbol);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TradingError> {
        request.send().await.map_err(transport_error)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TradingError> {
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            TradingError::BrokerUnavailable(format!("undecodable response (HTTP {status}): {e}"))
        })
    }
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    async fn get_account(&self) -> Result<Account, TradingError> {
        let response = self.send(self.request(Method::GET, "/v2/account")).await?;
        let account = Self::read_json::<AccountResponse>(response).await?;

        if account.trading_blocked {
            warn!("Account reports trading_blocked (status: {:?})", account.status);
        }
        account.to_domain()
    }

    async fn get_open_position(&self, symbol: &str) -> PositionLookup {
        let url = match self.position_url(symbol) {
            Ok(url) => url,
            Err(e) => return PositionLookup::Failed(e),
        };
        let response = match self.send(self.authed(self.client.get(url))).await {
            Ok(response) => response,
            Err(e) => return PositionLookup::Failed(e),
        };

        // Any other 404 (wrong base url, unknown route) says nothing about the position.
        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("code").and_then(|c| c.as_u64()));
            if code == Some(POSITION_NOT_FOUND) {
                debug!("No open position for {}", symbol);
                return PositionLookup::Absent;
            }
            return PositionLookup::Failed(TradingError::BrokerRejected {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: body,
            });
        }

        match Self::read_json::<PositionResponse>(response).await {
            Ok(position) => match position.to_domain() {
                Ok(position) => PositionLookup::Found(position),
                Err(e) => PositionLookup::Failed(e),
            },
            Err(e) => PositionLookup::Failed(e),
        }
    }

    async fn submit_order(&self, order: &OrderSpec) -> Result<SubmittedOrder, TradingError> {
        let body = OrderRequest::from(order);
        info!(
            "Placing Order: {} {} {} ({}, {})",
            body.side, body.qty, body.symbol, body.order_type, body.time_in_force
        );

        let response = self
            .send(self.request(Method::POST, "/v2/orders").json(&body))
            .await?;

        match Self::read_json::<OrderResponse>(response).await {
            Ok(order) => order.to_domain(),
            Err(e) => {
                error!("Alpaca Order Failed: {}", e);
                Err(e)
            }
        }
    }

    async fn close_position(
        &self,
        symbol: &str,
        qty: Decimal,
    ) -> Result<SubmittedOrder, TradingError> {
        let url = self.position_url(symbol)?;
        let response = self
            .send(
                self.authed(self.client.delete(url))
                    .query(&[("qty", qty.normalize().to_string())]),
            )
            .await?;

        let order = Self::read_json::<OrderResponse>(response).await?;
        info!("Position closed for {} ({} shares)", symbol, qty);
        order.to_domain()
    }

    async fn close_all_positions(&self) -> Result<CloseAllReport, TradingError> {
        let response = self
            .send(self.request(Method::DELETE, "/v2/positions"))
            .await?;
        let results = Self::read_json::<Vec<ClosePositionResult>>(response).await?;

        let mut report = CloseAllReport::default();
        for result in results {
            if result.is_success() {
                report.closed.push(result.symbol);
            } else {
                let message = result.failure_message();
                report.failed.push((result.symbol, message));
            }
        }
        Ok(report)
    }

    async fn cancel_all_orders(&self) -> Result<usize, TradingError> {
        let response = self.send(self.request(Method::DELETE, "/v2/orders")).await?;
        let results = Self::read_json::<Vec<CancelOrderResult>>(response).await?;

        let failed: Vec<&CancelOrderResult> = results
            .iter()
            .filter(|r| !(200..300).contains(&r.status))
            .collect();
        for result in &failed {
            warn!("Order {} could not be cancelled (HTTP {})", result.id, result.status);
        }
        Ok(results.len() - failed.len())
    }

    async fn list_activities(&self) -> Result<Vec<FillActivity>, TradingError> {
        let response = self
            .send(
                self.request(Method::GET, "/v2/account/activities")
                    .query(&[("direction", "desc"), ("page_size", "100")]),
            )
            .await?;
        let activities = Self::read_json::<Vec<ActivityResponse>>(response).await?;

        activities
            .iter()
            .filter(|a| a.is_fill())
            .map(|a| a.to_domain())
            .collect()
    }

    async fn list_portfolio_history(&self) -> Result<Vec<BalancePoint>, TradingError> {
        let response = self
            .send(self.request(Method::GET, "/v2/account/portfolio/history"))
            .await?;
        Self::read_json::<PortfolioHistoryResponse>(response)
            .await?
            .to_domain()
    }
}

fn transport_error(e: reqwest::Error) -> TradingError {
    if e.is_timeout() {
        TradingError::BrokerUnavailable(format!("request timed out: {e}"))
    } else {
        TradingError::BrokerUnavailable(e.to_string())
    }
}

/// Auth, throttling and server faults are transient; other 4xx are rejections.
async fn status_error(response: Response) -> TradingError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            TradingError::BrokerUnavailable(format!("HTTP {}: {}", status.as_u16(), message))
        }
        s if s.is_server_error() => {
            TradingError::BrokerUnavailable(format!("HTTP {}: {}", status.as_u16(), message))
        }
        _ => TradingError::BrokerRejected {
            status: status.as_u16(),
            message,
        },
    }
}
