//! Application-driven cache warming.
//!
//! The hosting page posts `{"type": "CACHE_URLS", "urls": [...]}`. Each URL is
//! fetched blind (no-cors) and whatever comes back is stored in the runtime
//! generation. Failures are dropped one URL at a time; a batch never fails.

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use vitrine_core::url::resolve;
use vitrine_core::Request;

use crate::engine::Engine;
use crate::router::ResourceClass;

/// Messages the worker understands. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "CACHE_URLS")]
    CacheUrls { urls: Vec<String> },
}

impl WorkerMessage {
    /// Parse a posted message; unknown or malformed shapes yield `None`.
    pub fn parse(data: &serde_json::Value) -> Option<Self> {
        WorkerMessage::deserialize(data).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Cached,
    Skipped,
    Failed,
}

/// Tally of one prefetch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    pub requested: usize,
    pub cached: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Engine {
    /// Handle a message posted by the hosting application.
    ///
    /// Returns the batch tally when the message was a prefetch request
    /// handled by an activated worker, `None` when it was ignored.
    pub async fn on_message(&self, data: &serde_json::Value) -> Option<PrefetchReport> {
        if !self.state().await.can_intercept() {
            tracing::debug!("message ignored, worker not activated");
            return None;
        }

        match WorkerMessage::parse(data) {
            Some(WorkerMessage::CacheUrls { urls }) => Some(self.prefetch(&urls).await),
            None => {
                tracing::debug!("ignoring unknown message");
                None
            }
        }
    }

    /// Warm the runtime generation with `urls`, in parallel and best-effort.
    pub async fn prefetch(&self, urls: &[String]) -> PrefetchReport {
        let limit = self.config.prefetch_concurrency.max(1);

        // Owned items keep the future `Send` when it runs on a spawned task.
        let outcomes: Vec<ItemOutcome> = stream::iter(urls.to_vec())
            .map(|url| async move { self.prefetch_one(&url).await })
            .buffer_unordered(limit)
            .collect()
            .await;

        let report = PrefetchReport {
            requested: urls.len(),
            cached: outcomes.iter().filter(|o| **o == ItemOutcome::Cached).count(),
            skipped: outcomes.iter().filter(|o| **o == ItemOutcome::Skipped).count(),
            failed: outcomes.iter().filter(|o| **o == ItemOutcome::Failed).count(),
        };
        tracing::debug!(?report, "prefetch batch done");
        report
    }

    async fn prefetch_one(&self, raw: &str) -> ItemOutcome {
        let url = match resolve(&self.config.origin, raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = raw, error = %e, "skipping unparsable prefetch url");
                return ItemOutcome::Skipped;
            }
        };

        let request = Request::opaque(url);
        match self.router.classify(&request) {
            ResourceClass::Excluded => return ItemOutcome::Skipped,
            ResourceClass::DynamicData if !self.config.prefetch_dynamic_data => return ItemOutcome::Skipped,
            _ => {}
        }

        match self.fetcher.fetch(&request).await {
            // Stored without looking at the status.
            Ok(response) => {
                self.store_response(&self.config.runtime_name(), &request.identity(), &response)
                    .await;
                ItemOutcome::Cached
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "prefetch failed");
                ItemOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{at, origin, FakeNetwork};
    use serde_json::json;
    use vitrine_core::{CacheStore, MemoryStore, WorkerConfig};

    async fn activated(network: &Arc<FakeNetwork>, store: &Arc<MemoryStore>, config: WorkerConfig) -> Engine {
        network.serve_shell();
        let engine = Engine::new(config, network.clone(), store.clone()).unwrap();
        engine.on_install().await.unwrap();
        engine.on_activate().await.unwrap();
        network.reset_calls();
        engine
    }

    fn urls(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    async fn stored_status(store: &MemoryStore, path: &str) -> Option<u16> {
        let identity = Request::opaque(origin().join(path).unwrap()).identity();
        store.match_entry("runtime-v1", &identity).await.unwrap().map(|r| r.status)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_prefetch_future_is_send() {
        let config = WorkerConfig::catalog_cache(origin());
        let engine = Engine::new(config, Arc::new(FakeNetwork::new()), Arc::new(MemoryStore::new())).unwrap();
        let batch = urls(&["/img/a.png"]);
        let data = json!({"type": "CACHE_URLS", "urls": ["/img/a.png"]});

        assert_send(&engine.prefetch(&batch));
        assert_send(&engine.on_message(&data));
    }

    #[tokio::test]
    async fn test_error_statuses_are_stored_blind() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let engine = activated(&network, &store, WorkerConfig::catalog_cache(origin())).await;
        network.serve(&at("/img/gone.png"), 404, "text/plain", "not found");
        network.serve(&at("/img/broken.png"), 500, "text/plain", "boom");

        let report = engine.prefetch(&urls(&["/img/gone.png", "/img/broken.png"])).await;

        assert_eq!(report.cached, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(stored_status(&store, "/img/gone.png").await, Some(404));
        assert_eq!(stored_status(&store, "/img/broken.png").await, Some(500));
    }

    #[tokio::test]
    async fn test_dynamic_data_skipped_when_disabled() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let mut config = WorkerConfig::catalog_cache(origin());
        config.prefetch_dynamic_data = false;
        let engine = activated(&network, &store, config).await;
        network.serve(&at("/api/catalog"), 200, "application/json", "{}");
        network.serve(&at("/img/a.png"), 200, "image/png", "a");

        let catalog = Request::opaque(origin().join("/api/catalog").unwrap());
        assert_eq!(engine.router().classify(&catalog), ResourceClass::DynamicData);

        let report = engine.prefetch(&urls(&["/api/catalog", "/img/a.png"])).await;

        assert_eq!(report, PrefetchReport { requested: 2, cached: 1, skipped: 1, failed: 0 });
        assert_eq!(network.calls_to(&at("/api/catalog")), 0);
        assert_eq!(stored_status(&store, "/api/catalog").await, None);
        assert_eq!(stored_status(&store, "/img/a.png").await, Some(200));
    }

    #[tokio::test]
    async fn test_dynamic_data_prefetched_by_default() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let engine = activated(&network, &store, WorkerConfig::catalog_cache(origin())).await;
        network.serve(&at("/api/catalog"), 200, "application/json", "{}");

        let report = engine.prefetch(&urls(&["/api/catalog"])).await;

        assert_eq!(report.cached, 1);
        assert_eq!(stored_status(&store, "/api/catalog").await, Some(200));
    }

    #[tokio::test]
    async fn test_report_tallies() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let mut config = WorkerConfig::catalog_cache(origin());
        config.rules.excluded_prefixes = vec!["/admin/".into()];
        let engine = activated(&network, &store, config).await;
        network.serve(&at("/img/a.png"), 200, "image/png", "a");
        network.serve(&at("/img/b.png"), 200, "image/png", "b");
        network.unreachable(&at("/img/c.png"));

        let report = engine
            .prefetch(&urls(&["/img/a.png", "/img/b.png", "/img/c.png", "/admin/users", "http://[bad", ""]))
            .await;

        assert_eq!(report, PrefetchReport { requested: 6, cached: 2, skipped: 3, failed: 1 });
        assert_eq!(network.calls_to(&at("/admin/users")), 0);
        assert_eq!(store.entries("runtime-v1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let engine = activated(&network, &store, WorkerConfig::catalog_cache(origin())).await;

        assert_eq!(engine.prefetch(&[]).await, PrefetchReport::default());
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_message_ignored_before_activation() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_shell();
        network.serve(&at("/img/a.png"), 200, "image/png", "a");
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(WorkerConfig::catalog_cache(origin()), network.clone(), store.clone()).unwrap();
        let data = json!({"type": "CACHE_URLS", "urls": ["/img/a.png"]});

        assert_eq!(engine.on_message(&data).await, None);
        engine.on_install().await.unwrap();
        network.reset_calls();
        assert_eq!(engine.on_message(&data).await, None);
        assert_eq!(network.calls(), 0);

        engine.on_activate().await.unwrap();
        let report = engine.on_message(&data).await.unwrap();
        assert_eq!(report.cached, 1);
    }

    #[tokio::test]
    async fn test_unknown_message_returns_none() {
        let network = Arc::new(FakeNetwork::new());
        let store = Arc::new(MemoryStore::new());
        let engine = activated(&network, &store, WorkerConfig::catalog_cache(origin())).await;

        assert_eq!(engine.on_message(&json!({"type": "SKIP_WAITING"})).await, None);
        assert_eq!(network.calls(), 0);
    }

    #[test]
    fn test_parse_cache_urls() {
        let msg = WorkerMessage::parse(&json!({"type": "CACHE_URLS", "urls": ["/a.png", "/api/catalog"]}));
        assert_eq!(msg, Some(WorkerMessage::CacheUrls { urls: vec!["/a.png".into(), "/api/catalog".into()] }));
    }

    #[test]
    fn test_parse_ignores_unknown_type() {
        assert_eq!(WorkerMessage::parse(&json!({"type": "SKIP_WAITING"})), None);
        assert_eq!(WorkerMessage::parse(&json!({"kind": "prefetch", "urls": []})), None);
    }

    #[test]
    fn test_parse_ignores_malformed() {
        assert_eq!(WorkerMessage::parse(&json!(null)), None);
        assert_eq!(WorkerMessage::parse(&json!("CACHE_URLS")), None);
        assert_eq!(WorkerMessage::parse(&json!({"type": "CACHE_URLS"})), None);
        assert_eq!(WorkerMessage::parse(&json!({"type": "CACHE_URLS", "urls": "/a.png"})), None);
        assert_eq!(WorkerMessage::parse(&json!({"type": "CACHE_URLS", "urls": [1, 2]})), None);
    }

    #[test]
    fn test_parse_empty_batch() {
        assert_eq!(
            WorkerMessage::parse(&json!({"type": "CACHE_URLS", "urls": []})),
            Some(WorkerMessage::CacheUrls { urls: Vec::new() })
        );
    }
}
