//! Wiring between the MCP tools and the worker registration.

use std::sync::Arc;

use url::Url;
use vitrine_core::{CacheStore, Error, Fetcher, WorkerConfig};
use vitrine_worker::{Engine, RegisterOutcome, Registration};

/// One origin's registration plus what is needed to build new worker versions.
pub struct Host {
    registration: Registration,
    base: WorkerConfig,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
}

impl Host {
    pub fn new(base: WorkerConfig, fetcher: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>) -> Self {
        Self { registration: Registration::new(fetcher.clone()), base, fetcher, store }
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn origin(&self) -> &Url {
        &self.base.origin
    }

    /// Build and register a worker, optionally under new version tags.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty version tag, or the install
    /// error when the shell could not be cached.
    pub async fn deploy(
        &self, precache_version: Option<&str>, runtime_version: Option<&str>,
    ) -> Result<RegisterOutcome, Error> {
        let precache = precache_version.unwrap_or(&self.base.precache_version);
        let runtime = runtime_version.unwrap_or(&self.base.runtime_version);
        if precache.trim().is_empty() || runtime.trim().is_empty() {
            return Err(Error::InvalidInput("version tags cannot be empty".into()));
        }

        let config = self.base.clone().with_versions(precache, runtime);
        tracing::info!(precache = %config.precache_name(), runtime = %config.runtime_name(), "deploying worker");

        let engine = Engine::new(config, self.fetcher.clone(), self.store.clone())?;
        self.registration.register(Arc::new(engine)).await
    }
}
