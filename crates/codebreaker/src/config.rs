//! Client configuration.

use std::path::Path;

use derive_getters::Getters;
use derive_setters::Setters;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::ConfigError;

const BASE_URL_VAR: &str = "CODEBREAKER_BASE_URL";
const LOG_LEVEL_VAR: &str = "CODEBREAKER_LOG_LEVEL";
const WORKER_THREADS_VAR: &str = "CODEBREAKER_WORKER_THREADS";
const CONNECT_TIMEOUT_VAR: &str = "CODEBREAKER_CONNECT_TIMEOUT_SECS";

/// Configuration for the HTTP service client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ClientConfig {
    /// Root URL of the Codebreaker service (e.g. `http://localhost:8080/codebreaker`).
    #[setters(into)]
    base_url: String,

    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    #[setters(into)]
    log_level: String,

    /// Size of the transport worker pool.
    #[serde(default = "default_worker_threads")]
    worker_threads: usize,

    /// Connect timeout handed to the transport, in seconds.
    #[serde(default)]
    #[setters(strip_option)]
    connect_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_worker_threads() -> usize {
    2
}

impl ClientConfig {
    /// Creates a configuration for the given service root with defaults elsewhere.
    #[instrument(skip(base_url))]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            log_level: default_log_level(),
            worker_threads: default_worker_threads(),
            connect_timeout_secs: None,
        }
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        info!(base_url = %config.base_url, "Config loaded successfully");
        Ok(config)
    }

    /// Builds configuration from `CODEBREAKER_*` environment variables.
    ///
    /// Returns `Ok(None)` when no base URL is set.
    #[instrument]
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    #[instrument(skip(lookup))]
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(base_url) = lookup(BASE_URL_VAR) else {
            debug!("No base URL in environment");
            return Ok(None);
        };

        let mut config = Self::new(base_url);
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.log_level = level;
        }
        if let Some(threads) = lookup(WORKER_THREADS_VAR) {
            config.worker_threads = threads.trim().parse().map_err(|e| {
                ConfigError::new(format!("Invalid {}: {}", WORKER_THREADS_VAR, e))
            })?;
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_VAR) {
            config.connect_timeout_secs = Some(secs.trim().parse().map_err(|e| {
                ConfigError::new(format!("Invalid {}: {}", CONNECT_TIMEOUT_VAR, e))
            })?);
        }
        config.validate()?;
        Ok(Some(config))
    }

    /// Checks field ranges and parses the base URL.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_root()?;
        if self.worker_threads == 0 {
            return Err(ConfigError::new("worker_threads must be at least 1"));
        }
        Ok(())
    }

    /// Parsed base URL without a trailing slash.
    pub fn service_root(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| ConfigError::new(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::new(format!(
                "Unsupported base URL scheme '{}'",
                other
            ))),
        }
    }
}
