//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve store location, log location, log level and check interval.
//! - Fall back to per-user data directories when variables are unset.
//!
//! # Invariants
//! - Blank variables behave as unset.
//! - The check interval is at least one second.

use crate::logging::{init_logging, LogLevel};
use crate::reminder::scheduler::DEFAULT_CHECK_INTERVAL;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "REMINDNOTE_DB_PATH";
pub const ENV_LOG_DIR: &str = "REMINDNOTE_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "REMINDNOTE_LOG_LEVEL";
pub const ENV_CHECK_INTERVAL_SECS: &str = "REMINDNOTE_CHECK_INTERVAL_SECS";

const APP_DIR_NAME: &str = "remindnote";
const DB_FILE_NAME: &str = "remindnote.sqlite3";

/// Configuration error raised for malformed environment values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    InvalidCheckInterval(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{ENV_LOG_LEVEL}: {message}"),
            Self::InvalidCheckInterval(value) => write!(
                f,
                "{ENV_CHECK_INTERVAL_SECS}: expected a whole number of seconds >= 1, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: LogLevel,
    pub check_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let app_dir = default_app_dir();
        Self {
            db_path: app_dir.join(DB_FILE_NAME),
            log_dir: app_dir.join("logs"),
            log_level: LogLevel::build_default(),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = LogLevel::parse(&level).map_err(ConfigError::InvalidLogLevel)?;
        }
        if let Some(raw) = read(ENV_CHECK_INTERVAL_SECS) {
            config.check_interval = match raw.parse::<u64>() {
                Ok(secs) if secs >= 1 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidCheckInterval(raw)),
            };
        }

        Ok(config)
    }

    /// Starts file logging at `log_dir` with `log_level`.
    ///
    /// Same contract as [`init_logging`]: idempotent for an unchanged
    /// configuration, error text otherwise.
    pub fn init_logging(&self) -> Result<(), String> {
        let log_dir = self.log_dir.to_str().ok_or_else(|| {
            format!(
                "log_dir must be valid UTF-8, got `{}`",
                self.log_dir.display()
            )
        })?;
        init_logging(self.log_level.as_str(), log_dir)
    }
}

fn default_app_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}
