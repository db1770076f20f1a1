//! services/explorer/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use explorer_core::persistence::API_BASE_KEY;
use explorer_core::KeyValueStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_MAX_SAVED_TOPICS: usize = 50;
pub const DEFAULT_MAX_SAVED_REPORTS: usize = 6;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Caps on the saved lists. Inserting past a cap evicts the oldest entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedLimits {
    pub max_topics: usize,
    pub max_reports: usize,
}

impl Default for SavedLimits {
    fn default() -> Self {
        Self {
            max_topics: DEFAULT_MAX_SAVED_TOPICS,
            max_reports: DEFAULT_MAX_SAVED_REPORTS,
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Explicit API base; when set it is also persisted as the new stored base.
    pub api_base_override: Option<String>,
    pub state_file: PathBuf,
    pub log_level: Level,
    pub default_user_email: Option<String>,
    pub default_username: Option<String>,
    pub limits: SavedLimits,
    pub connect_timeout: Duration,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let state_file = std::env::var("EXPLORER_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./explorer-state.json"));

        let max_topics = parse_var("EXPLORER_MAX_SAVED_TOPICS", DEFAULT_MAX_SAVED_TOPICS)?;
        let max_reports = parse_var("EXPLORER_MAX_SAVED_REPORTS", DEFAULT_MAX_SAVED_REPORTS)?;
        if max_topics == 0 || max_reports == 0 {
            return Err(ConfigError::InvalidValue(
                "EXPLORER_MAX_SAVED_*".to_string(),
                "caps must be at least 1".to_string(),
            ));
        }

        let connect_timeout_secs = parse_var("EXPLORER_CONNECT_TIMEOUT_SECS", 10u64)?;

        Ok(Self {
            api_base_override: optional_var("EXPLORER_API_BASE"),
            state_file,
            log_level,
            default_user_email: optional_var("EXPLORER_USER_EMAIL"),
            default_username: optional_var("EXPLORER_USERNAME"),
            limits: SavedLimits {
                max_topics,
                max_reports,
            },
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// Resolves the API base: an explicit override (which is persisted), then the
    /// stored value, then the default.
    pub fn resolve_api_base(&self, store: &dyn KeyValueStore) -> String {
        if let Some(base) = &self.api_base_override {
            store.set(API_BASE_KEY, base);
        }
        store
            .get(API_BASE_KEY)
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }
}
