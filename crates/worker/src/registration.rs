//! Host-side bookkeeping of worker instances for one origin.
//!
//! At most one instance is active (serving) and at most one is waiting
//! (installed, not yet in control). A failed install never disturbs the
//! active instance.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use vitrine_core::{CapturedResponse, Clock, Error, Fetcher, Request, SystemClock};

use crate::engine::Engine;
use crate::lifecycle::ActivateReport;
use crate::strategy::{FetchOutcome, ResponseSource};

/// What happened to a newly registered instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RegisterOutcome {
    /// Installed and now in control.
    Activated(ActivateReport),
    /// Installed, waiting for open pages to go away.
    Waiting,
}

/// A response as delivered to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub response: CapturedResponse,
    pub source: ResponseSource,
}

pub struct Registration {
    network: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    active: RwLock<Option<Arc<Engine>>>,
    waiting: RwLock<Option<Arc<Engine>>>,
}

impl Registration {
    /// `network` serves requests no worker intercepts.
    pub fn new(network: Arc<dyn Fetcher>) -> Self {
        Self { network, clock: Arc::new(SystemClock), active: RwLock::new(None), waiting: RwLock::new(None) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn active(&self) -> Option<Arc<Engine>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Engine>> {
        self.waiting.read().await.clone()
    }

    /// Install a new instance and, when allowed, put it in control.
    ///
    /// # Errors
    ///
    /// Returns the install error; the new instance is then redundant and the
    /// active one keeps serving.
    pub async fn register(&self, engine: Arc<Engine>) -> Result<RegisterOutcome, Error> {
        engine.on_install().await?;

        let has_active = self.active.read().await.is_some();
        if !has_active || engine.config().activate_immediately {
            let report = self.promote(engine).await?;
            return Ok(RegisterOutcome::Activated(report));
        }

        let previous = self.waiting.write().await.replace(engine);
        if let Some(previous) = previous {
            previous.mark_redundant().await;
        }
        tracing::info!("new worker installed and waiting");
        Ok(RegisterOutcome::Waiting)
    }

    /// Activate the waiting instance, as when every controlled page closed.
    pub async fn activate_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        let Some(engine) = self.waiting.write().await.take() else {
            return Ok(None);
        };
        self.promote(engine).await.map(Some)
    }

    async fn promote(&self, engine: Arc<Engine>) -> Result<ActivateReport, Error> {
        let waiting = self.waiting.write().await.take();
        if let Some(waiting) = waiting
            && !Arc::ptr_eq(&waiting, &engine)
        {
            waiting.mark_redundant().await;
        }

        let previous = self.active.write().await.replace(Arc::clone(&engine));
        if let Some(previous) = previous {
            previous.settle().await;
            previous.mark_redundant().await;
        }

        engine.on_activate().await
    }

    /// Deliver a request to the controlling worker, or to the network when
    /// there is none or it declines.
    pub async fn fetch(&self, request: &Request) -> Served {
        if let Some(engine) = self.active().await
            && let FetchOutcome::Respond { response, source } = engine.on_fetch(request).await
        {
            return Served { response, source };
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "pass-through request failed");
                CapturedResponse::network_error(request.url.as_str(), self.clock.now())
            }
        };
        Served { response, source: ResponseSource::PassThrough }
    }

    /// Post a message to the controlling worker. Fire-and-forget.
    ///
    /// Returns whether there was a worker to receive it.
    pub async fn post_message(&self, data: serde_json::Value) -> bool {
        match self.active().await {
            Some(engine) => {
                engine.dispatch_message(data);
                true
            }
            None => false,
        }
    }

    /// Wait for outstanding message work on the active worker.
    pub async fn settle(&self) {
        if let Some(engine) = self.active().await {
            engine.settle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::WorkerState;
    use crate::testing::{at, origin, FakeNetwork};
    use serde_json::json;
    use vitrine_core::{CacheStore, MemoryStore, WorkerConfig};

    fn engine(network: &Arc<FakeNetwork>, store: &Arc<MemoryStore>, version: &str) -> Arc<Engine> {
        let config = WorkerConfig::catalog_cache(origin()).with_versions(version, version);
        Arc::new(Engine::new(config, network.clone(), store.clone()).unwrap())
    }

    #[tokio::test]
    async fn test_first_registration_activates() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());

        let outcome = registration.register(engine(&network, &store, "v1")).await.unwrap();

        assert!(matches!(outcome, RegisterOutcome::Activated(_)));
        assert!(registration.active().await.is_some());
        assert!(registration.waiting().await.is_none());
    }

    #[tokio::test]
    async fn test_update_waits_then_activates() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());
        let first = engine(&network, &store, "v1");
        registration.register(first.clone()).await.unwrap();

        let second = engine(&network, &store, "v2");
        let outcome = registration.register(second.clone()).await.unwrap();

        assert_eq!(outcome, RegisterOutcome::Waiting);
        assert_eq!(second.state().await, WorkerState::Installed);
        assert_eq!(first.state().await, WorkerState::Activated);

        let report = registration.activate_waiting().await.unwrap().unwrap();

        assert_eq!(report.deleted, vec!["precache-v1", "runtime-v1"]);
        assert_eq!(first.state().await, WorkerState::Redundant);
        assert_eq!(second.state().await, WorkerState::Activated);
        assert_eq!(store.keys().await.unwrap(), vec!["precache-v2", "runtime-v2"]);
        assert!(registration.activate_waiting().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newer_waiting_replaces_older() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());
        registration.register(engine(&network, &store, "v1")).await.unwrap();

        let second = engine(&network, &store, "v2");
        let third = engine(&network, &store, "v3");
        registration.register(second.clone()).await.unwrap();
        registration.register(third.clone()).await.unwrap();

        assert_eq!(second.state().await, WorkerState::Redundant);
        assert!(Arc::ptr_eq(&registration.waiting().await.unwrap(), &third));
    }

    #[tokio::test]
    async fn test_activate_immediately_skips_waiting() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());
        registration.register(engine(&network, &store, "v1")).await.unwrap();

        let mut config = WorkerConfig::catalog_cache(origin()).with_versions("v2", "v2");
        config.activate_immediately = true;
        let eager = Arc::new(Engine::new(config, network.clone(), store.clone()).unwrap());
        let outcome = registration.register(eager.clone()).await.unwrap();

        match outcome {
            RegisterOutcome::Activated(report) => assert!(report.claimed),
            other => panic!("expected activation, got {other:?}"),
        }
        assert!(Arc::ptr_eq(&registration.active().await.unwrap(), &eager));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_active_worker() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());
        let first = engine(&network, &store, "v1");
        registration.register(first.clone()).await.unwrap();

        network.unreachable(&at("/manifest.webmanifest"));
        let result = registration.register(engine(&network, &store, "v2")).await;

        assert!(result.is_err());
        assert!(Arc::ptr_eq(&registration.active().await.unwrap(), &first));
        assert!(registration.waiting().await.is_none());
        assert_eq!(store.keys().await.unwrap(), vec!["precache-v1", "runtime-v1"]);
    }

    #[tokio::test]
    async fn test_fetch_without_worker_goes_to_network() {
        let network = Arc::new(FakeNetwork::new());
        network.serve(&at("/about"), 200, "text/html", "about");
        let registration = Registration::new(network.clone());

        let served = registration.fetch(&Request::get(origin().join("/about").unwrap())).await;
        assert_eq!(served.source, ResponseSource::PassThrough);
        assert_eq!(served.response.status, 200);

        let served = registration.fetch(&Request::get(origin().join("/missing").unwrap())).await;
        assert!(served.response.is_network_error());
    }

    #[tokio::test]
    async fn test_post_message_requires_active_worker() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        network.serve(&at("/img/a.png"), 200, "image/png", "png");
        let store = Arc::new(MemoryStore::new());
        let registration = Registration::new(network.clone());
        let message = json!({"type": "CACHE_URLS", "urls": ["/img/a.png"]});

        assert!(!registration.post_message(message.clone()).await);

        registration.register(engine(&network, &store, "v1")).await.unwrap();
        assert!(registration.post_message(message).await);
        registration.settle().await;

        assert_eq!(store.entries("runtime-v1").await.unwrap().len(), 1);
    }
}
