use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::TradingError;
use common::models::{NewSignal, Signal, SignalAction};
use common::traits::SignalQueue;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, warn};

#[derive(sqlx::FromRow)]
struct SignalRow {
    id: i64,
    ticker: String,
    order_action: String,
    order_price: String,
    received_at: DateTime<Utc>,
}

impl SignalRow {
    fn into_signal(self) -> Result<Signal, TradingError> {
        let action = SignalAction::from_str(&self.order_action)?;
        let order_price = Decimal::from_str(&self.order_price).map_err(|e| {
            TradingError::Storage(format!("corrupt price '{}': {}", self.order_price, e))
        })?;

        Ok(Signal {
            id: self.id,
            symbol: self.ticker,
            action,
            order_price,
            received_at: self.received_at,
        })
    }
}

fn storage_err(e: sqlx::Error) -> TradingError {
    TradingError::Storage(e.to_string())
}

/// SQLite-backed signal queue.
#[derive(Clone)]
pub struct SignalRepository {
    pool: SqlitePool,
}

impl SignalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalQueue for SignalRepository {
    async fn insert(&self, signal: NewSignal) -> Result<Signal, TradingError> {
        let received_at = Utc::now();

        let id = sqlx::query_scalar::<_, i64>(
            r#"
                INSERT INTO webhook_signals (ticker, order_action, order_price, received_at)
                VALUES (?, ?, ?, ?)
                RETURNING id
            "#,
        )
        .bind(&signal.symbol)
        .bind(signal.action.as_str())
        .bind(signal.order_price.to_string())
        .bind(received_at)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!("Queued signal {} for {}", id, signal.symbol);

        Ok(Signal {
            id,
            symbol: signal.symbol,
            action: signal.action,
            order_price: signal.order_price,
            received_at,
        })
    }

    async fn find_most_recent(&self, limit: u32) -> Result<Vec<Signal>, TradingError> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
                SELECT id, ticker, order_action, order_price, received_at
                FROM webhook_signals
                ORDER BY id DESC
                LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut signals = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_signal() {
                Ok(signal) => signals.push(signal),
                Err(e) => {
                    // Undecodable rows would otherwise sit at the head of the queue forever.
                    warn!("Dropping unreadable signal {}: {}", id, e);
                    self.delete(id).await?;
                }
            }
        }
        Ok(signals)
    }

    async fn delete(&self, id: i64) -> Result<bool, TradingError> {
        let result = sqlx::query("DELETE FROM webhook_signals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, TradingError> {
        let result = sqlx::query("DELETE FROM webhook_signals")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected())
    }
}
