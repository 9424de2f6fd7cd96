//! Configuration loading, validation, and management for oxtutor.
//!
//! Loads configuration from `~/.oxtutor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `~/.oxtutor/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenRouter API key (the only cloud dependency)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Reasoner model id
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for observation cycles
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Student-model database configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Transcription endpoint configuration
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Observation loop tuning
    #[serde(default)]
    pub observation: ObservationConfig,
}

fn default_model() -> String {
    "google/gemini-3.0-pro".into()
}
fn default_temperature() -> f32 {
    0.3
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]").unwrap_or("None"),
            )
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("server", &self.server)
            .field("store", &self.store)
            .field("transcription", &self.transcription)
            .field("observation", &self.observation)
            .finish()
    }
}

/// HTTP/WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    7860
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// SQLite student-model store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "./memory/oxtutor.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Speech-to-text endpoint settings.
///
/// Points at an OpenAI-compatible `/audio/transcriptions` endpoint —
/// typically a local whisper server. Empty endpoint disables transcription
/// (the transcript tool degrades gracefully).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_whisper_model")]
    pub model: String,
}

fn default_whisper_model() -> String {
    "whisper-1".into()
}

/// Observation loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Default seconds between observation cycles
    #[serde(default = "default_interval")]
    pub interval_seconds: f64,

    /// Reasoner round-trip ceiling per cycle
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,

    /// Back-off after a failed cycle
    #[serde(default = "default_cooldown")]
    pub cycle_cooldown_seconds: f64,

    /// Silence duration that activates triggers
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_seconds: f64,

    /// Visual change magnitude that activates triggers (0.0 to 1.0)
    #[serde(default = "default_change_threshold")]
    pub visual_change_threshold: f64,
}

fn default_interval() -> f64 {
    5.0
}
fn default_max_iterations() -> u32 {
    10
}
fn default_cooldown() -> f64 {
    5.0
}
fn default_silence_threshold() -> f64 {
    3.0
}
fn default_change_threshold() -> f64 {
    0.1
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            max_tool_iterations: default_max_iterations(),
            cycle_cooldown_seconds: default_cooldown(),
            silence_threshold_seconds: default_silence_threshold(),
            visual_change_threshold: default_change_threshold(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl AppConfig {
    /// Load configuration from the default path with env overrides.
    ///
    /// Environment variables:
    /// - `OXTUTOR_API_KEY` / `OPENROUTER_API_KEY` — API key
    /// - `OXTUTOR_MODEL` — reasoner model id
    /// - `OXTUTOR_DB_PATH` — student-model database path
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("OXTUTOR_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("OXTUTOR_MODEL") {
            config.model = model;
        }
        if let Ok(path) = std::env::var("OXTUTOR_DB_PATH") {
            config.store.db_path = path;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".oxtutor")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.observation.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "observation.max_tool_iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.observation.visual_change_threshold) {
            return Err(ConfigError::ValidationError(
                "observation.visual_change_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            transcription: TranscriptionConfig::default(),
            observation: ObservationConfig::default(),
        }
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 7860);
        assert!((config.observation.interval_seconds - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, default_model());
    }

    #[test]
    fn parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "anthropic/claude-sonnet-4"

[server]
port = 9000

[observation]
interval_seconds = 2.5
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.server.port, 9000);
        assert!((config.observation.interval_seconds - 2.5).abs() < f64::EPSILON);
        // Untouched sections keep defaults
        assert_eq!(config.store.db_path, default_db_path());
    }

    #[test]
    fn rejects_bad_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = 9.0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dump = format!("{config:?}");
        assert!(!dump.contains("sk-secret"));
        assert!(dump.contains("REDACTED"));
    }
}
