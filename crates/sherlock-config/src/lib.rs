//! Configuration loading for Sherlock.
//! Reads sherlock.toml from the current directory or the path in SHERLOCK_CONFIG.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sherlock_common::SherlockError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}

fn default_base_url()     -> String { "http://localhost:8080".to_string() }
fn default_timeout_secs() -> u64    { 30 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the session (tokens, cached credentials, role) is persisted.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
    /// Cache credentials after login so an expired token can be renewed silently.
    #[serde(default = "bool_true")]
    pub remember_credentials: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { path: default_session_path(), remember_credentials: bool_true() }
    }
}

fn default_session_path() -> PathBuf { PathBuf::from(".sherlock/session.json") }
fn bool_true()            -> bool    { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// List views refetch on this interval.
    #[serde(default = "default_refresh_secs")]
    pub interval_secs: u64,
    /// Log-bundle and OTA progress polling interval.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: default_refresh_secs(), poll_secs: default_poll_secs() }
    }
}

fn default_refresh_secs() -> u64 { 60 }
fn default_poll_secs()    -> u64 { 5 }

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

fn default_log_filter() -> String { "sherlock=debug,info".to_string() }


impl Config {
    /// Load configuration.
    /// Loads `.env` first, then SHERLOCK_CONFIG or ./sherlock.toml. A missing
    /// file yields the defaults. SHERLOCK_API_URL overrides `api.base_url`.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("SHERLOCK_CONFIG")
            .unwrap_or_else(|_| "sherlock.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path);
            Config::default()
        };

        if let Ok(url) = std::env::var("SHERLOCK_API_URL") {
            config.api.base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SherlockError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SherlockError::Config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(SherlockError::Config("api.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
