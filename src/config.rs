//! Runtime configuration for the assessment proctor.
//!
//! Policy (what counts as a violation) lives in [`crate::policy`]; this is
//! how the engine runs: where events go, how often sources are polled.

use crate::sink::SinkConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote sink endpoints
    pub sink: SinkConfig,

    /// Bound on a single event delivery
    #[serde(with = "duration_ms")]
    pub sink_timeout: Duration,

    /// How often the viewport is measured
    #[serde(with = "duration_ms")]
    pub viewport_poll_interval: Duration,

    /// How often inactivity is checked
    #[serde(with = "duration_ms")]
    pub inactivity_check_interval: Duration,

    /// How often the occurrence queue is drained
    #[serde(with = "duration_ms")]
    pub queue_poll_interval: Duration,

    /// How long a notice stays visible
    #[serde(with = "duration_ms")]
    pub notice_duration: Duration,

    /// Editor quiet period before content is auto-saved
    #[serde(with = "duration_ms")]
    pub autosave_quiet_period: Duration,

    /// Directory holding the pending-events slot
    pub pending_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("assessment-proctor");

        Self {
            sink: SinkConfig::default(),
            sink_timeout: Duration::from_secs(10),
            viewport_poll_interval: Duration::from_millis(500),
            inactivity_check_interval: Duration::from_secs(60),
            queue_poll_interval: Duration::from_millis(20),
            notice_duration: Duration::from_secs(5),
            autosave_quiet_period: Duration::from_secs(3),
            pending_dir: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration, filling absent fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("assessment-proctor")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.pending_dir)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
