use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use brokerage::remote::{AlpacaConfig, PAPER_BASE_URL};

/// Signals pulled from the queue per cycle.
pub const BATCH_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Pause between cycles.
    pub poll_interval: Duration,
    /// Pause after the batch itself could not be fetched.
    pub error_backoff: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_path: String,
    pub settings_path: String,
    pub webhook_passphrase: String,
    pub bind_addr: SocketAddr,
    pub alpaca: AlpacaConfig,
    pub timing: EngineTiming,
    pub purge_on_boot: bool,
    pub telegram: Option<TelegramConfig>,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} not set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let timeout_secs: u64 = parse_or(&lookup, "BROKER_TIMEOUT_SECS", 10)?;
        let poll_ms: u64 = parse_or(&lookup, "POLL_INTERVAL_MS", 1_000)?;
        let backoff_ms: u64 = parse_or(&lookup, "ERROR_BACKOFF_MS", 2_000)?;

        let telegram = match (lookup("TELEGRAM_BOT_TOKEN"), lookup("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                token,
                chat_id: chat_id
                    .parse()
                    .context("TELEGRAM_CHAT_ID must be a number")?,
            }),
            _ => None,
        };

        Ok(Self {
            database_path: or_default("DATABASE_PATH", "data/signals.db"),
            settings_path: or_default("SETTINGS_PATH", "config.json"),
            webhook_passphrase: required("WEBHOOK_PASSPHRASE")?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:5000")
                .parse()
                .context("BIND_ADDR must be host:port")?,
            alpaca: AlpacaConfig {
                base_url: or_default("APCA_BASE_URL", PAPER_BASE_URL),
                api_key: required("APCA_API_KEY_ID")?,
                secret_key: required("APCA_API_SECRET_KEY")?,
                timeout: Duration::from_secs(timeout_secs),
            },
            timing: EngineTiming {
                poll_interval: Duration::from_millis(poll_ms),
                error_backoff: Duration::from_millis(backoff_ms),
            },
            purge_on_boot: parse_or(&lookup, "PURGE_SIGNALS_ON_BOOT", false)?,
            telegram,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
