//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
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

/// Name of the current cache generation. Bump to invalidate every older store.
pub const CACHE_NAME: &str = "price-scanner-v1";

/// Assets pre-fetched into the store at install time.
pub const DEFAULT_MANIFEST: &[&str] = &["/", "/index.html", "/share.html"];

/// Cached page served to document requests when the network is down.
pub const SHELL_URL: &str = "/index.html";

/// Background sync tag the controller responds to.
pub const SYNC_TAG: &str = "sync-analysis";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache store.
    ///
    /// Set via SHELLCACHE_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin the controller serves; only same-origin responses are written back.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// URLs fetched and stored at install time, relative to `origin`.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Offline fallback for document requests.
    ///
    /// Set via SHELLCACHE_SHELL_URL environment variable.
    #[serde(default = "default_shell_url")]
    pub shell_url: String,

    /// Background sync tag that triggers the analysis hook.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Path to SQLite cache database. In-memory stores when unset.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// User-Agent string for network requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size buffered per request.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_name() -> String {
    CACHE_NAME.into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_shell_url() -> String {
    SHELL_URL.into()
}

fn default_sync_tag() -> String {
    SYNC_TAG.into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            manifest: default_manifest(),
            shell_url: default_shell_url(),
            sync_tag: default_sync_tag(),
            db_path: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
