//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::cache::key::resolve;
use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `manifest` is empty or an entry does not resolve against `origin`
    /// - `shell_url` does not resolve against `origin`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_name".into(), reason: "must not be empty".into() });
        }

        let origin = self.origin_url()?;

        if self.manifest.is_empty() {
            return Err(ConfigError::Invalid { field: "manifest".into(), reason: "must list at least one URL".into() });
        }
        for entry in &self.manifest {
            resolve(&origin, entry)
                .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: e.to_string() })?;
        }

        let shell = resolve(&origin, &self.shell_url)
            .map_err(|e| ConfigError::Invalid { field: "shell_url".into(), reason: e.to_string() })?;
        let shell_in_manifest = self
            .manifest
            .iter()
            .filter_map(|entry| resolve(&origin, entry).ok())
            .any(|url| url == shell);
        if !shell_in_manifest {
            tracing::warn!(
                shell_url = %self.shell_url,
                "shell_url is not in the manifest; offline document fallback depends on it being cached at runtime"
            );
        }

        if self.sync_tag.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "sync_tag".into(), reason: "must not be empty".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
