//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (KONTEXT_*)
//! 2. TOML config file (if KONTEXT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (KONTEXT_*)
/// 2. TOML config file (if KONTEXT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP front end binds to.
    ///
    /// Set via KONTEXT_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path to the SQLite response store.
    ///
    /// Set via KONTEXT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via KONTEXT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via KONTEXT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via KONTEXT_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects to follow on a live fetch.
    ///
    /// Set via KONTEXT_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Access token key for the twitter activitystreams proxy.
    ///
    /// Set via KONTEXT_TWITTER_AU_KEY environment variable. The proxy URL
    /// rewriter activates only when both the key and the secret are set.
    #[serde(default)]
    pub twitter_au_key: Option<String>,

    /// Access token secret for the twitter activitystreams proxy.
    ///
    /// Set via KONTEXT_TWITTER_AU_SECRET environment variable.
    #[serde(default)]
    pub twitter_au_secret: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./kontext.sqlite")
}

fn default_user_agent() -> String {
    "kontext/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            twitter_au_key: None,
            twitter_au_secret: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `KONTEXT_`
    /// 2. TOML file from `KONTEXT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("KONTEXT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("KONTEXT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The twitter proxy credential pair, when both halves are configured.
    pub fn twitter_credentials(&self) -> Option<(&str, &str)> {
        match (self.twitter_au_key.as_deref(), self.twitter_au_secret.as_deref()) {
            (Some(key), Some(secret)) => Some((key, secret)),
            _ => None,
        }
    }
}
