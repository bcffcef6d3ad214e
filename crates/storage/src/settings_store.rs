use std::path::{Path, PathBuf};

use common::models::TradingSettings;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings file {path} is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Spellings `TradingSettings` also accepts on load. Dropped on save so the
/// rewritten document never carries both forms of a field.
const SNAKE_CASE_KEYS: [&str; 2] = ["order_type", "time_in_force"];

/// Trading preferences persisted as a JSON document.
///
/// Keys other than the two preferences are left untouched on save.
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields the defaults.
    pub async fn load(&self) -> Result<TradingSettings, SettingsError> {
        let document = match self.read_document().await? {
            Some(document) => document,
            None => {
                warn!(
                    "No settings at {}, using defaults",
                    self.path.display()
                );
                return Ok(TradingSettings::default());
            }
        };

        serde_json::from_value(Value::Object(document)).map_err(|source| SettingsError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub async fn save(&self, settings: &TradingSettings) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?.unwrap_or_default();
        let encoded = serde_json::to_value(settings).map_err(|source| self.parse_err(source))?;
        for alias in SNAKE_CASE_KEYS {
            document.remove(alias);
        }
        if let Value::Object(fields) = encoded {
            document.extend(fields);
        }

        let body = serde_json::to_vec_pretty(&Value::Object(document))
            .map_err(|source| self.parse_err(source))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| self.io_err(source))?;

        info!(
            "Updated trading preferences: order_type={}, time_in_force={}",
            settings.order_type, settings.time_in_force
        );
        Ok(())
    }

    async fn read_document(&self) -> Result<Option<Map<String, Value>>, SettingsError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_err(source)),
        };

        let value: Value = serde_json::from_slice(&raw).map_err(|source| self.parse_err(source))?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(Some(Map::new())),
        }
    }

    fn io_err(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn parse_err(&self, source: serde_json::Error) -> SettingsError {
        SettingsError::Parse {
            path: self.path.display().to_string(),
            source,
        }
    }
}
