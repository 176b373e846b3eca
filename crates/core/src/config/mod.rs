//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GENCACHE_*)
//! 2. TOML config file (if GENCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GENCACHE_*)
/// 2. TOML config file (if GENCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache generation tag. Changing it on deploy forces a rollover.
    ///
    /// Set via GENCACHE_GENERATION_ID environment variable.
    #[serde(default = "default_generation_id")]
    pub generation_id: String,

    /// Paths fetched and stored when a generation is installed, in order.
    ///
    /// Set via GENCACHE_SEED_PATHS as an array, e.g. `["/", "/static/app.js"]`.
    #[serde(default = "default_seed_paths")]
    pub seed_paths: Vec<String>,

    /// Origin of the web application whose requests are intercepted.
    ///
    /// Set via GENCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via GENCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network fetches.
    ///
    /// Set via GENCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional fetch timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via GENCACHE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Treat page entries past their `sw-cache-expire` stamp as misses.
    ///
    /// Set via GENCACHE_HONOR_PAGE_EXPIRY environment variable.
    #[serde(default = "default_true")]
    pub honor_page_expiry: bool,
}

fn default_generation_id() -> String {
    "blockwire-v1".into()
}

fn default_seed_paths() -> Vec<String> {
    ["/", "/static/styles.css", "/static/app.js", "/static/ticker_fix.css"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./gencache.sqlite")
}

fn default_user_agent() -> String {
    "gencache/0.1".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation_id: default_generation_id(),
            seed_paths: default_seed_paths(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            honor_page_expiry: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GENCACHE_`
    /// 2. TOML file from `GENCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("GENCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GENCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
