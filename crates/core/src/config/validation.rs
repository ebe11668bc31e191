//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::url::parse_origin;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - a version tag is empty
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `prefetch_concurrency` is 0
    ///
    /// Returns `ConfigError::Missing` if `precache_urls` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_origin(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;

        if self.precache_version.trim().is_empty() {
            return Err(invalid("precache_version", "must not be empty"));
        }
        if self.runtime_version.trim().is_empty() {
            return Err(invalid("runtime_version", "must not be empty"));
        }

        if self.precache_urls.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_urls".into(),
                hint: "list at least the root document, e.g. [\"/\"]".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.prefetch_concurrency == 0 {
            return Err(invalid("prefetch_concurrency", "must be at least 1"));
        }

        if self.excluded_prefixes.iter().any(|p| !p.starts_with('/')) {
            return Err(invalid("excluded_prefixes", "prefixes must start with '/'"));
        }

        if self.cache_dynamic_data {
            let shadowed: Vec<&String> = self
                .dynamic_patterns
                .iter()
                .filter(|pattern| self.excluded_prefixes.iter().any(|prefix| pattern.starts_with(prefix.as_str())))
                .collect();
            if !shadowed.is_empty() {
                tracing::warn!(
                    ?shadowed,
                    "dynamic_patterns fall under excluded_prefixes; \
                     excluded paths are never cached"
                );
            }
        }

        Ok(())
    }
}
