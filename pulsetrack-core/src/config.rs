//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pulsetrack/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pulsetrack/` (~/.config/pulsetrack/)
//! - State/Logs: `$XDG_STATE_HOME/pulsetrack/` (~/.local/state/pulsetrack/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Activity tracker configuration
///
/// `user_id` and `device_id` are optional; when absent, identity falls
/// back to hostname-derived values at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Collector server URL (e.g., `http://localhost:5000`)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// User identifier attached to every batch
    pub user_id: Option<String>,

    /// Device identifier attached to every batch
    pub device_id: Option<String>,

    /// Max seconds to wait before sending an incomplete batch
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Max events per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Max seconds to wait for the sender thread on shutdown
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            user_id: None,
            device_id: None,
            flush_interval_secs: default_flush_interval(),
            max_batch_size: default_max_batch_size(),
            request_timeout_secs: default_request_timeout(),
            join_timeout_secs: default_join_timeout(),
        }
    }
}

impl TrackerConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("tracker.server_url must not be empty".to_string()));
        }
        if self.max_batch_size == 0 || self.max_batch_size > 1000 {
            return Err(Error::Config(
                "tracker.max_batch_size must be between 1 and 1000".to_string(),
            ));
        }
        if self.flush_interval_secs == 0 {
            return Err(Error::Config(
                "tracker.flush_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "tracker.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Flush interval as a [`Duration`]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// HTTP request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shutdown join timeout as a [`Duration`]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_flush_interval() -> u64 {
    60
}

fn default_max_batch_size() -> usize {
    100
}

fn default_request_timeout() -> u64 {
    30
}

fn default_join_timeout() -> u64 {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pulsetrack/config.toml` (~/.config/pulsetrack/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pulsetrack").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pulsetrack/` (~/.local/state/pulsetrack/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pulsetrack")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pulsetrack/pulsetrack.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pulsetrack.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.server_url, "http://localhost:5000");
        assert_eq!(config.tracker.flush_interval_secs, 60);
        assert_eq!(config.tracker.max_batch_size, 100);
        assert_eq!(config.tracker.request_timeout_secs, 30);
        assert_eq!(config.tracker.join_timeout_secs, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.tracker.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[tracker]
server_url = "https://activity.example.com"
user_id = "alice"
device_id = "workstation-7"
flush_interval_secs = 30
max_batch_size = 50

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.tracker.server_url, "https://activity.example.com");
        assert_eq!(config.tracker.user_id.as_deref(), Some("alice"));
        assert_eq!(config.tracker.device_id.as_deref(), Some("workstation-7"));
        assert_eq!(config.tracker.flush_interval_secs, 30);
        assert_eq!(config.tracker.max_batch_size, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_tracker_config_validation() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());

        let config = TrackerConfig {
            server_url: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            max_batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            max_batch_size: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            flush_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tracker]\nserver_url = \"http://collector:5000\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tracker.server_url, "http://collector:5000");
        // Unspecified fields fall back to defaults
        assert_eq!(config.tracker.max_batch_size, 100);
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = PathBuf::from("/nonexistent/pulsetrack/config.toml");
        assert!(Config::load_from(&path).is_err());
    }
}
