//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `STOREDASH_*` environment variable overrides.

use crate::export::ExportFormat;
use crate::feed::FeedConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST API the panels load their collections from
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Live feed connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_feed_url() -> String {
    "ws://localhost:4000/feed".to_string()
}

fn default_channel() -> String {
    "transactions".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    5
}

fn default_recent_limit() -> usize {
    10
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            channel: default_channel(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl FeedSettings {
    pub fn to_feed_config(&self) -> FeedConfig {
        FeedConfig::default()
            .max_retries(self.max_retries)
            .retry_delay(Duration::from_secs(self.retry_delay_secs))
            .recent_limit(self.recent_limit)
    }
}

/// Export output settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: String,

    #[serde(default)]
    pub format: ExportFormat,
}

fn default_export_dir() -> String {
    dirs::download_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "./exports".to_string())
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
            format: ExportFormat::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("storedash").join("config.toml")),
            Some(PathBuf::from("./storedash.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(url) = var("STOREDASH_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = var("STOREDASH_API_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.api.request_timeout_secs = t;
            }
        }

        // Feed overrides
        if let Some(url) = var("STOREDASH_FEED_URL") {
            self.feed.url = url;
        }
        if let Some(channel) = var("STOREDASH_FEED_CHANNEL") {
            self.feed.channel = channel;
        }
        if let Some(retries) = var("STOREDASH_FEED_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.feed.max_retries = r;
            }
        }
        if let Some(delay) = var("STOREDASH_FEED_RETRY_DELAY") {
            if let Ok(d) = delay.parse() {
                self.feed.retry_delay_secs = d;
            }
        }
        if let Some(limit) = var("STOREDASH_FEED_RECENT_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.feed.recent_limit = l;
            }
        }

        // Export overrides
        if let Some(dir) = var("STOREDASH_EXPORT_DIR") {
            self.export.dir = dir;
        }
        if let Some(format) = var("STOREDASH_EXPORT_FORMAT") {
            if let Some(f) = ExportFormat::parse(&format) {
                self.export.format = f;
            }
        }

        // Logging overrides
        if let Some(level) = var("STOREDASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("STOREDASH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# storedash configuration
#
# Environment variables override these settings:
# - STOREDASH_API_URL
# - STOREDASH_API_TIMEOUT
# - STOREDASH_FEED_URL
# - STOREDASH_FEED_CHANNEL
# - STOREDASH_FEED_MAX_RETRIES
# - STOREDASH_FEED_RETRY_DELAY
# - STOREDASH_FEED_RECENT_LIMIT
# - STOREDASH_EXPORT_DIR
# - STOREDASH_EXPORT_FORMAT
# - STOREDASH_LOG_LEVEL
# - STOREDASH_LOG_FORMAT

[api]
# Base URL of the REST API serving orders, transactions and revenue
base_url = "http://localhost:3000/api"

# Request timeout in seconds
request_timeout_secs = 10

[feed]
# WebSocket endpoint of the push server
url = "ws://localhost:4000/feed"

# Channel carrying newTransaction events
channel = "transactions"

# Reconnect attempts before giving up
max_retries = 5

# Delay between reconnect attempts (seconds)
retry_delay_secs = 5

# Length of the recent transactions ticker
recent_limit = 10

[export]
# Directory export files are written to
dir = "./exports"

# Default format: csv or json
format = "csv"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.feed.max_retries, 5);
        assert_eq!(config.feed.retry_delay_secs, 5);
        assert_eq!(config.export.dir, "./exports");
        assert_eq!(config.export.format, ExportFormat::Csv);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\nchannel = \"orders\"\n\n[export]\nformat = \"json\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.feed.channel, "orders");
        assert_eq!(config.feed.url, "ws://localhost:4000/feed");
        assert_eq!(config.export.format, ExportFormat::Json);
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/storedash.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[feed\nurl = 1").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOREDASH_API_URL", "https://shop.example.com/api"),
            ("STOREDASH_FEED_MAX_RETRIES", "3"),
            ("STOREDASH_FEED_RETRY_DELAY", "30"),
            ("STOREDASH_FEED_RECENT_LIMIT", "-1"),
            ("STOREDASH_API_TIMEOUT", "not-a-number"),
            ("STOREDASH_EXPORT_FORMAT", "JSON"),
            ("STOREDASH_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://shop.example.com/api");
        assert_eq!(config.feed.max_retries, 3);
        assert_eq!(config.feed.retry_delay_secs, 30);
        assert_eq!(config.feed.recent_limit, 10);
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.export.format, ExportFormat::Json);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_feed_config_conversion() {
        let settings = FeedSettings {
            retry_delay_secs: 2,
            recent_limit: 25,
            ..FeedSettings::default()
        };
        let feed = settings.to_feed_config();
        assert_eq!(feed.max_retries, 5);
        assert_eq!(feed.retry_delay, Duration::from_secs(2));
        assert_eq!(feed.recent_limit, 25);
    }
}
