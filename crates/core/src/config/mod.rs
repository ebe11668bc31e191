//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VITRINE_*)
//! 2. TOML config file (if VITRINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;
mod worker;

pub use validation::ConfigError;
pub use worker::{RoutingRules, WorkerConfig};

/// Which cache store backend the host opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sqlite,
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VITRINE_*)
/// 2. TOML config file (if VITRINE_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List values given through the environment use figment's array syntax,
/// e.g. `VITRINE_EXCLUDED_PREFIXES='["/api/"]'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storefront origin; relative URLs resolve against it.
    ///
    /// Set via VITRINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cache store backend.
    ///
    /// Set via VITRINE_STORE environment variable (`sqlite` or `memory`).
    #[serde(default = "default_store")]
    pub store: StoreKind,

    /// Path to SQLite cache database.
    ///
    /// Set via VITRINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via VITRINE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via VITRINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via VITRINE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Version tag of the precache generation (`precache-<tag>`).
    ///
    /// Bumping it is the only way to invalidate the shell.
    #[serde(default = "default_version")]
    pub precache_version: String,

    /// Version tag of the runtime generation (`runtime-<tag>`).
    #[serde(default = "default_version")]
    pub runtime_version: String,

    /// Shell URLs fetched at install time, all or nothing.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Same-origin path prefixes the worker never intercepts.
    #[serde(default)]
    pub excluded_prefixes: Vec<String>,

    /// URL fragments identifying dynamic catalog data.
    #[serde(default = "default_dynamic_patterns")]
    pub dynamic_patterns: Vec<String>,

    /// Whether dynamic data is cached network-first at all.
    #[serde(default = "default_true")]
    pub cache_dynamic_data: bool,

    /// Whether prefetch batches may warm dynamic-data URLs.
    #[serde(default = "default_true")]
    pub prefetch_dynamic_data: bool,

    /// Maximum in-flight fetches per prefetch batch.
    #[serde(default = "default_prefetch_concurrency")]
    pub prefetch_concurrency: usize,

    /// Precached document served to navigations when offline.
    #[serde(default = "default_navigation_fallback")]
    pub navigation_fallback: Option<String>,

    /// Take control of open pages as soon as a new worker installs.
    #[serde(default)]
    pub activate_immediately: bool,
}

fn default_origin() -> String {
    "http://localhost:10000".into()
}

fn default_store() -> StoreKind {
    StoreKind::Sqlite
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./vitrine-cache.sqlite")
}

fn default_user_agent() -> String {
    "vitrine/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_version() -> String {
    "v1".into()
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.webmanifest".into()]
}

fn default_dynamic_patterns() -> Vec<String> {
    vec!["/api/catalog".into()]
}

fn default_prefetch_concurrency() -> usize {
    6
}

fn default_navigation_fallback() -> Option<String> {
    Some("/index.html".into())
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            store: default_store(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            precache_version: default_version(),
            runtime_version: default_version(),
            precache_urls: default_precache_urls(),
            excluded_prefixes: Vec::new(),
            dynamic_patterns: default_dynamic_patterns(),
            cache_dynamic_data: true,
            prefetch_dynamic_data: true,
            prefetch_concurrency: default_prefetch_concurrency(),
            navigation_fallback: default_navigation_fallback(),
            activate_immediately: false,
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
    /// 1. Environment variables prefixed with `VITRINE_`
    /// 2. TOML file from `VITRINE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("VITRINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VITRINE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
