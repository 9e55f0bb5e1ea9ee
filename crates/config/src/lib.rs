//! Configuration loading, validation, and management for Solace.
//!
//! Loads configuration from `~/.solace/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! [`AppConfig`] is constructed once at process start and handed to the
//! engines that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.solace/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Memory store and decay settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Sensitive-content redaction settings
    #[serde(default)]
    pub redaction: RedactionConfig,

    /// Context assembly defaults
    #[serde(default)]
    pub context: ContextConfig,

    /// Feedback write retry settings
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "sqlite" or "in_memory"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// SQLite database file. Defaults to `~/.solace/memory.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Items untouched for this many days decay once per cleanup.
    #[serde(default = "default_decay_after_days")]
    pub decay_after_days: u32,

    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Items below this weight are no longer retrievable and get purged.
    #[serde(default = "default_prune_below_weight")]
    pub prune_below_weight: f64,

    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,

    /// Background cleanup period (0 = no background cleanup).
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}
fn default_decay_after_days() -> u32 {
    30
}
fn default_decay_factor() -> f64 {
    0.9
}
fn default_prune_below_weight() -> f64 {
    0.1
}
fn default_query_limit() -> usize {
    100
}
fn default_cleanup_interval_minutes() -> u64 {
    60
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            database_path: None,
            decay_after_days: default_decay_after_days(),
            decay_factor: default_decay_factor(),
            prune_below_weight: default_prune_below_weight(),
            default_query_limit: default_query_limit(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

impl MemoryConfig {
    /// Resolved SQLite path, falling back to the config directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(p) => expand_home(p),
            None => AppConfig::config_dir().join("memory.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Minimum sensitivity level that forces review: low|medium|high|critical
    #[serde(default = "default_review_threshold")]
    pub review_threshold: String,
}

fn default_review_threshold() -> String {
    "medium".into()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            review_threshold: default_review_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,

    #[serde(default = "default_memory_min_weight")]
    pub memory_min_weight: f64,

    #[serde(default = "default_recent_message_limit")]
    pub recent_message_limit: usize,
}

fn default_max_tokens() -> usize {
    4000
}
fn default_memory_limit() -> usize {
    10
}
fn default_memory_min_weight() -> f64 {
    0.3
}
fn default_recent_message_limit() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            memory_limit: default_memory_limit(),
            memory_min_weight: default_memory_min_weight(),
            recent_message_limit: default_recent_message_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Oldest queued feedback is dropped past this many items.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_backoff_ms() -> u64 {
    1000
}
fn default_retry_interval_secs() -> u64 {
    300
}
fn default_max_pending() -> usize {
    1000
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            retry_interval_secs: default_retry_interval_secs(),
            max_pending: default_max_pending(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

const REVIEW_LEVELS: [&str; 4] = ["low", "medium", "high", "critical"];

impl AppConfig {
    /// Load configuration from the default path (~/.solace/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `SOLACE_DB_PATH`
    /// - `SOLACE_MAX_TOKENS`
    /// - `SOLACE_REVIEW_THRESHOLD`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
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

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var("SOLACE_DB_PATH") {
            self.memory.database_path = Some(path);
        }

        if let Ok(tokens) = std::env::var("SOLACE_MAX_TOKENS") {
            self.context.max_tokens = tokens.parse().map_err(|_| {
                ConfigError::ValidationError(format!("SOLACE_MAX_TOKENS is not a number: {tokens}"))
            })?;
        }

        if let Ok(level) = std::env::var("SOLACE_REVIEW_THRESHOLD") {
            self.redaction.review_threshold = level.to_ascii_lowercase();
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".solace")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.memory.decay_factor > 0.0 && self.memory.decay_factor < 1.0) {
            return Err(ConfigError::ValidationError(
                "memory.decay_factor must be between 0.0 and 1.0 (exclusive)".into(),
            ));
        }

        if self.memory.prune_below_weight < 0.0 {
            return Err(ConfigError::ValidationError(
                "memory.prune_below_weight must be >= 0".into(),
            ));
        }

        if !matches!(self.memory.backend.as_str(), "sqlite" | "in_memory") {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be \"sqlite\" or \"in_memory\", got \"{}\"",
                self.memory.backend
            )));
        }

        if self.context.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tokens must be > 0".into(),
            ));
        }

        if !REVIEW_LEVELS.contains(&self.redaction.review_threshold.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "redaction.review_threshold must be one of {:?}",
                REVIEW_LEVELS
            )));
        }

        if self.feedback.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "feedback.max_attempts must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

fn expand_home(p: &str) -> PathBuf {
    match p.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(p),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for solace_core::Error {
    fn from(e: ConfigError) -> Self {
        solace_core::Error::Config { message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.decay_after_days, 30);
        assert_eq!(config.memory.decay_factor, 0.9);
        assert_eq!(config.context.max_tokens, 4000);
        assert_eq!(config.feedback.max_attempts, 3);
        assert_eq!(config.feedback.max_pending, 1000);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.memory.backend, config.memory.backend);
        assert_eq!(parsed.context.memory_limit, config.context.memory_limit);
    }

    #[test]
    fn invalid_decay_factor_rejected() {
        let mut config = AppConfig::default();
        config.memory.decay_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_review_threshold_rejected() {
        let mut config = AppConfig::default();
        config.redaction.review_threshold = "severe".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().memory.backend, "sqlite");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[memory]
backend = "in_memory"
decay_after_days = 14

[context]
max_tokens = 1200
"#
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.memory.backend, "in_memory");
        assert_eq!(config.memory.decay_after_days, 14);
        assert_eq!(config.memory.decay_factor, 0.9);
        assert_eq!(config.context.max_tokens, 1200);
        assert_eq!(config.redaction.review_threshold, "medium");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[memory\nbackend = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("decay_factor"));
        assert!(toml_str.contains("review_threshold"));
    }

    #[test]
    fn explicit_database_path_is_used() {
        let mut config = MemoryConfig::default();
        config.database_path = Some("/var/lib/solace/mem.db".into());
        assert_eq!(config.resolved_database_path(), PathBuf::from("/var/lib/solace/mem.db"));
    }
}
