//! Application settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `DRIVER_MONITOR__*` environment variables
//! (e.g. `DRIVER_MONITOR__MONITOR__EAR_THRESHOLD=0.22`).

use alerting::NotificationConfig;
use dms::{DmsError, MonitorConfig};
use landmark_source::{SourceConfig, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DRIVER_MONITOR";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid monitor settings: {0}")]
    Monitor(#[from] DmsError),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `dms=debug,info`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Alert history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON-lines file for persistent history; in-memory only when unset
    pub path: Option<String>,
    /// Records kept in memory
    pub max_records: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_records: 10_000,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub notifications: NotificationConfig,
    pub source: SourceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub history: HistoryConfig,
}

impl Settings {
    /// Load defaults, then the optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.monitor.validate()?;

        let n = &self.notifications;
        for (name, value) in [
            ("warning_sound_cooldown_sec", n.warning_sound_cooldown_sec),
            ("danger_sound_cooldown_sec", n.danger_sound_cooldown_sec),
            ("email_cooldown_sec", n.email_cooldown_sec),
            ("history_debounce_sec", n.history_debounce_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Invalid(format!("notifications.{} = {}", name, value)));
            }
        }

        let s = &self.source;
        if s.fps == 0 || s.image_width == 0 || s.image_height == 0 {
            return Err(SettingsError::Invalid(
                "source fps and image size must be non-zero".to_string(),
            ));
        }
        if s.kind == SourceKind::Replay && s.replay_path.is_none() {
            return Err(SettingsError::Invalid(
                "source.replay_path is required for replay".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a partial JSON document on top of these settings
    pub fn merged(&self, patch: serde_json::Value) -> Result<Self, SettingsError> {
        let mut current =
            serde_json::to_value(self).map_err(|e| SettingsError::Invalid(e.to_string()))?;
        merge_json(&mut current, patch);
        let merged: Settings =
            serde_json::from_value(current).map_err(|e| SettingsError::Invalid(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }
}

fn merge_json(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Shared, atomically replaceable settings snapshot
#[derive(Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<Arc<Settings>>>,
}

impl ConfigHandle {
    pub fn new(settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(settings));
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot; never changes underneath the caller
    pub fn snapshot(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    /// Validate and publish a new snapshot
    pub fn replace(&self, settings: Settings) -> Result<Arc<Settings>, SettingsError> {
        settings.validate()?;
        let settings = Arc::new(settings);
        self.tx.send_replace(settings.clone());
        info!("Settings updated");
        Ok(settings)
    }
}
