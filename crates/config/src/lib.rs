//! Configuration loading, validation, and management for Overwatch.
//!
//! Loads configuration from `~/.overwatch/config.toml` with environment
//! variable overrides. Validates all settings at startup — a missing
//! planner credential is the one mission-fatal configuration error, and it
//! is reported before the loop starts, never mid-mission.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Report output form for the final mission artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            other => Err(format!("unknown report format '{other}' (expected text|markdown|html)")),
        }
    }
}

/// The root configuration structure.
///
/// Maps directly to `~/.overwatch/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Planner API key. Resolved from config file or environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name sent to the planner backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Use the deterministic canned planner instead of the real backend.
    #[serde(default)]
    pub dummy_planner: bool,

    /// Seconds before an LLM request is abandoned.
    #[serde(default = "default_planner_timeout")]
    pub planner_timeout_secs: u64,

    /// Seconds before an executing command is cut off.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Re-prompt attempts allowed per iteration on malformed proposals.
    #[serde(default = "default_max_retries")]
    pub max_proposal_retries: u32,

    /// Disable result memoization entirely.
    #[serde(default)]
    pub disable_cache: bool,

    /// Final report output form.
    #[serde(default)]
    pub report_format: ReportFormat,

    /// Mission log location. Defaults to `~/.overwatch/mission_log.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Dynamic arsenal location. Defaults to `~/.overwatch/arsenal.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arsenal_file: Option<PathBuf>,
}

fn default_model() -> String {
    "gemini-2.5-pro".into()
}
fn default_planner_timeout() -> u64 {
    120
}
fn default_command_timeout() -> u64 {
    900
}
fn default_max_retries() -> u32 {
    3
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("dummy_planner", &self.dummy_planner)
            .field("planner_timeout_secs", &self.planner_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("max_proposal_retries", &self.max_proposal_retries)
            .field("disable_cache", &self.disable_cache)
            .field("report_format", &self.report_format)
            .field("log_file", &self.log_file)
            .field("arsenal_file", &self.arsenal_file)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            dummy_planner: false,
            planner_timeout_secs: default_planner_timeout(),
            command_timeout_secs: default_command_timeout(),
            max_proposal_retries: default_max_retries(),
            disable_cache: false,
            report_format: ReportFormat::default(),
            log_file: None,
            arsenal_file: None,
        }
    }
}

/// Errors from configuration loading.
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
    /// Load configuration from the default path (~/.overwatch/config.toml).
    ///
    /// Also checks environment variables:
    /// - `OVERWATCH_API_KEY` (highest priority) / `GEMINI_API_KEY` — credential
    /// - `OVERWATCH_MODEL` — model override
    /// - `OVERWATCH_DUMMY_PLANNER` — canned planner switch
    /// - `OVERWATCH_LOG_FILE`, `OVERWATCH_ARSENAL_FILE` — artifact paths
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
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

    /// Apply environment variable overrides (highest priority).
    pub fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OVERWATCH_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("OVERWATCH_MODEL") {
            self.model = model;
        }

        if let Ok(v) = std::env::var("OVERWATCH_DUMMY_PLANNER") {
            self.dummy_planner = matches!(v.as_str(), "1" | "true" | "yes");
        }

        if let Ok(path) = std::env::var("OVERWATCH_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("OVERWATCH_ARSENAL_FILE") {
            self.arsenal_file = Some(PathBuf::from(path));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".overwatch")
    }

    /// Resolved mission log path.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("mission_log.json"))
    }

    /// Resolved dynamic arsenal path.
    pub fn arsenal_path(&self) -> PathBuf {
        self.arsenal_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("arsenal.jsonl"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "command_timeout_secs must be > 0".into(),
            ));
        }
        if self.max_proposal_retries == 0 {
            return Err(ConfigError::ValidationError(
                "max_proposal_retries must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Check if a planner credential is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");

    home.map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}
