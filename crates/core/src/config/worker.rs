//! Engine-facing configuration.
//!
//! `WorkerConfig` is what one worker instance is built from. The two shipped
//! storefront variants differ only here: [`WorkerConfig::catalog_cache`]
//! caches the catalog endpoint network-first, [`WorkerConfig::api_passthrough`]
//! leaves all API traffic alone and takes over open pages immediately.

use url::Url;

use super::{AppConfig, ConfigError};
use crate::url::parse_origin;

/// Inputs of the request classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRules {
    /// Same-origin path prefixes that are never intercepted.
    pub excluded_prefixes: Vec<String>,
    /// Substrings of the URL marking dynamic catalog data.
    pub dynamic_patterns: Vec<String>,
    /// When false, dynamic-data URLs are treated like any other shell request.
    pub cache_dynamic_data: bool,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self { excluded_prefixes: Vec::new(), dynamic_patterns: vec!["/api/catalog".into()], cache_dynamic_data: true }
    }
}

/// Everything one worker instance needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub precache_version: String,
    pub runtime_version: String,
    pub precache_urls: Vec<String>,
    pub rules: RoutingRules,
    pub prefetch_dynamic_data: bool,
    pub prefetch_concurrency: usize,
    pub navigation_fallback: Option<String>,
    pub activate_immediately: bool,
}

impl WorkerConfig {
    /// Variant that caches `/api/catalog` network-first and waits for open
    /// pages to close before activating.
    pub fn catalog_cache(origin: Url) -> Self {
        Self {
            origin,
            precache_version: "v1".into(),
            runtime_version: "v1".into(),
            precache_urls: vec!["/".into(), "/index.html".into(), "/manifest.webmanifest".into()],
            rules: RoutingRules::default(),
            prefetch_dynamic_data: true,
            prefetch_concurrency: 6,
            navigation_fallback: Some("/index.html".into()),
            activate_immediately: false,
        }
    }

    /// Variant that hands every `/api/` request to the origin untouched and
    /// activates as soon as it is installed.
    pub fn api_passthrough(origin: Url) -> Self {
        Self {
            rules: RoutingRules { excluded_prefixes: vec!["/api/".into()], dynamic_patterns: Vec::new(), cache_dynamic_data: false },
            prefetch_dynamic_data: false,
            activate_immediately: true,
            ..Self::catalog_cache(origin)
        }
    }

    /// Same configuration with new version tags, as produced by a deploy.
    pub fn with_versions(mut self, precache: &str, runtime: &str) -> Self {
        self.precache_version = precache.to_string();
        self.runtime_version = runtime.to_string();
        self
    }

    pub fn precache_name(&self) -> String {
        format!("precache-{}", self.precache_version)
    }

    pub fn runtime_name(&self) -> String {
        format!("runtime-{}", self.runtime_version)
    }
}

impl AppConfig {
    /// Build the engine configuration from loaded settings.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        let origin = parse_origin(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        Ok(WorkerConfig {
            origin,
            precache_version: self.precache_version.clone(),
            runtime_version: self.runtime_version.clone(),
            precache_urls: self.precache_urls.clone(),
            rules: RoutingRules {
                excluded_prefixes: self.excluded_prefixes.clone(),
                dynamic_patterns: self.dynamic_patterns.clone(),
                cache_dynamic_data: self.cache_dynamic_data,
            },
            prefetch_dynamic_data: self.prefetch_dynamic_data,
            prefetch_concurrency: self.prefetch_concurrency,
            navigation_fallback: self.navigation_fallback.clone(),
            activate_immediately: self.activate_immediately,
        })
    }
}
