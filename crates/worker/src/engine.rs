//! The worker engine: one installable worker instance.
//!
//! An `Engine` owns no platform globals. Hosts construct it with a fetcher,
//! a cache store and optionally a clock, then drive it through the four
//! hooks: [`Engine::on_install`], [`Engine::on_activate`], [`Engine::on_fetch`]
//! and [`Engine::on_message`].

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use url::Url;
use vitrine_core::url::resolve;
use vitrine_core::{CacheStore, CapturedResponse, Clock, Error, Fetcher, Request, RequestIdentity, SystemClock, WorkerConfig};

use crate::lifecycle::{ActivateReport, WorkerState};
use crate::router::{ResourceClass, Router};
use crate::strategy::FetchOutcome;

/// Entry count of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationStatus {
    pub name: String,
    pub entries: usize,
}

/// Snapshot of an engine for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: WorkerState,
    pub precache: String,
    pub runtime: String,
    pub generations: Vec<GenerationStatus>,
}

pub struct Engine {
    pub(crate) config: WorkerConfig,
    pub(crate) router: Router,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) navigation_fallback: Option<Url>,
    pub(crate) state: RwLock<WorkerState>,
    tasks: TaskTracker,
}

impl Engine {
    /// Build a worker instance in the `installing` state.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the navigation fallback cannot be
    /// resolved against the origin.
    pub fn new(config: WorkerConfig, fetcher: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>) -> Result<Self, Error> {
        let navigation_fallback = config
            .navigation_fallback
            .as_deref()
            .map(|path| resolve(&config.origin, path))
            .transpose()?;
        let router = Router::new(config.origin.clone(), config.rules.clone());

        Ok(Self {
            config,
            router,
            fetcher,
            store,
            clock: Arc::new(SystemClock),
            navigation_fallback,
            state: RwLock::new(WorkerState::Installing),
            tasks: TaskTracker::new(),
        })
    }

    /// Replace the wall clock, e.g. with a fixed one in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn advance(&self, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        *state = state.transition(next)?;
        tracing::info!(
            precache = %self.config.precache_name(),
            runtime = %self.config.runtime_name(),
            state = %next,
            "worker state changed"
        );
        Ok(())
    }

    /// Populate the precache generation with the shell, all or nothing.
    ///
    /// Every shell URL is fetched before anything is written; a transport
    /// failure or a non-2xx status on any of them leaves the store untouched
    /// and makes this instance redundant.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` naming the first URL that failed, or
    /// `Error::InvalidState` if the instance is not installing.
    pub async fn on_install(&self) -> Result<(), Error> {
        let current = self.state().await;
        if current != WorkerState::Installing {
            return Err(Error::InvalidState { expected: "installing".into(), actual: current.to_string() });
        }

        match self.populate_precache().await {
            Ok(count) => {
                tracing::info!(precache = %self.config.precache_name(), entries = count, "precache populated");
                self.advance(WorkerState::Installed).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "install failed, worker will not activate");
                self.advance(WorkerState::Redundant).await?;
                Err(e)
            }
        }
    }

    async fn populate_precache(&self) -> Result<usize, Error> {
        let precache = self.config.precache_name();

        let requests = self
            .config
            .precache_urls
            .iter()
            .map(|path| {
                resolve(&self.config.origin, path)
                    .map(Request::get)
                    .map_err(|e| Error::InstallFailed { url: path.clone(), reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let responses = join_all(requests.iter().map(|request| self.fetcher.fetch(request))).await;

        let mut entries: Vec<(RequestIdentity, CapturedResponse)> = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(responses) {
            let response = result.map_err(|e| Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() })?;
            if !(200..300).contains(&response.status) {
                return Err(Error::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            let stamped = CapturedResponse { captured_at: self.clock.now(), ..response };
            entries.push((request.identity(), stamped));
        }

        self.store.put_all(&precache, &entries).await?;
        self.store.open(&self.config.runtime_name()).await?;

        Ok(entries.len())
    }

    /// Promote this instance and delete every superseded generation.
    ///
    /// Store errors during cleanup are logged; activation itself still
    /// completes, and the leftovers go on the next activation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the instance is not installed.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.advance(WorkerState::Activating).await?;

        let keep = [self.config.precache_name(), self.config.runtime_name()];
        let mut report = ActivateReport { deleted: Vec::new(), claimed: self.config.activate_immediately };

        match self.store.keys().await {
            Ok(names) => {
                for name in names.into_iter().filter(|name| !keep.contains(name)) {
                    match self.store.delete(&name).await {
                        Ok(_) => report.deleted.push(name),
                        Err(e) => tracing::warn!(generation = %name, error = %e, "failed to delete old generation"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not list generations during activation"),
        }

        self.advance(WorkerState::Activated).await?;
        tracing::info!(deleted = ?report.deleted, claimed = report.claimed, "worker activated");
        Ok(report)
    }

    /// Retire this instance after a newer one took over, or abandon it.
    pub async fn mark_redundant(&self) {
        let mut state = self.state.write().await;
        if let Ok(next) = state.transition(WorkerState::Redundant) {
            *state = next;
            tracing::info!(precache = %self.config.precache_name(), "worker is redundant");
        }
    }

    /// Answer an intercepted request.
    ///
    /// Never fails: transport failures resolve to cached or synthetic
    /// responses, and a worker that is not activated declines everything.
    pub async fn on_fetch(&self, request: &Request) -> FetchOutcome {
        if !self.state().await.can_intercept() {
            return FetchOutcome::PassThrough;
        }

        let class = self.router.classify(request);
        tracing::debug!(method = %request.method, url = %request.url, %class, "intercepted");

        match class {
            ResourceClass::Excluded => FetchOutcome::PassThrough,
            ResourceClass::Image => self.cache_first(request).await,
            ResourceClass::DynamicData => self.network_first(request).await,
            ResourceClass::Shell => self.shell(request).await,
        }
    }

    /// Run a message on a tracked task so the host can wait for it.
    pub fn dispatch_message(self: &Arc<Self>, data: serde_json::Value) {
        let engine = Arc::clone(self);
        self.tasks.spawn(async move {
            engine.on_message(&data).await;
        });
    }

    /// Wait until every dispatched message has been handled.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Generation names and entry counts.
    pub async fn status(&self) -> Result<EngineStatus, Error> {
        let mut generations = Vec::new();
        for name in self.store.keys().await? {
            let entries = self.store.entries(&name).await?.len();
            generations.push(GenerationStatus { name, entries });
        }

        Ok(EngineStatus {
            state: self.state().await,
            precache: self.config.precache_name(),
            runtime: self.config.runtime_name(),
            generations,
        })
    }
}
