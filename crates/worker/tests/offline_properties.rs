//! End-to-end offline behaviour, run against both cache backends.

use std::sync::Arc;

use serde_json::json;
use vitrine_core::response::EMPTY_CATALOG_JSON;
use vitrine_core::{CacheStore, MemoryStore, Request, SqliteStore, WorkerConfig};
use vitrine_worker::testing::{at, origin, FakeNetwork};
use vitrine_worker::{Engine, RegisterOutcome, Registration, ResponseSource, WorkerState};

async fn sqlite() -> Arc<dyn CacheStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
}

fn memory() -> Arc<dyn CacheStore> {
    Arc::new(MemoryStore::new())
}

fn worker(network: &Arc<FakeNetwork>, store: &Arc<dyn CacheStore>, config: WorkerConfig) -> Arc<Engine> {
    Arc::new(Engine::new(config, network.clone(), store.clone()).unwrap())
}

fn catalog_worker(network: &Arc<FakeNetwork>, store: &Arc<dyn CacheStore>, version: &str) -> Arc<Engine> {
    worker(network, store, WorkerConfig::catalog_cache(origin()).with_versions(version, version))
}

/// A registration with one activated catalog worker and a quiet call log.
async fn online(store: &Arc<dyn CacheStore>) -> (Arc<FakeNetwork>, Registration) {
    let network = Arc::new(FakeNetwork::new());
    network.serve_shell();
    let registration = Registration::new(network.clone());
    registration.register(catalog_worker(&network, store, "v1")).await.unwrap();
    network.reset_calls();
    (network, registration)
}

fn image(path: &str) -> Request {
    Request::image(origin().join(path).unwrap())
}

fn catalog() -> Request {
    Request::get(origin().join("/api/catalog").unwrap())
}

async fn install_atomicity(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    let first = registration.active().await.unwrap();
    network.serve(&at("/img/a.png"), 200, "image/png", "a");
    registration.fetch(&image("/img/a.png")).await;

    network.unreachable(&at("/index.html"));
    let update = catalog_worker(&network, &store, "v2");
    assert!(registration.register(update.clone()).await.is_err());

    assert_eq!(update.state().await, WorkerState::Redundant);
    assert!(!store.has("precache-v2").await.unwrap());
    assert!(Arc::ptr_eq(&registration.active().await.unwrap(), &first));

    network.set_offline(true);
    let served = registration.fetch(&Request::navigate(origin())).await;
    assert_eq!(served.source, ResponseSource::Cache);
    let served = registration.fetch(&image("/img/a.png")).await;
    assert_eq!(served.source, ResponseSource::Cache);
}

async fn generation_cleanup(store: Arc<dyn CacheStore>) {
    store.open("precache-v0").await.unwrap();
    store.open("runtime-v0").await.unwrap();
    let (network, registration) = online(&store).await;
    assert_eq!(store.keys().await.unwrap(), vec!["precache-v1", "runtime-v1"]);

    let outcome = registration.register(catalog_worker(&network, &store, "v2")).await.unwrap();
    assert_eq!(outcome, RegisterOutcome::Waiting);
    registration.activate_waiting().await.unwrap();

    assert_eq!(store.keys().await.unwrap(), vec!["precache-v2", "runtime-v2"]);
}

async fn late_write_after_update(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    network.serve(&at("/img/slow.png"), 200, "image/png", "slow");
    let hold = network.hold(&at("/img/slow.png"));

    let old = registration.active().await.unwrap();
    let pending = tokio::spawn(async move { old.on_fetch(&image("/img/slow.png")).await });
    hold.entered().await;

    let mut config = WorkerConfig::catalog_cache(origin()).with_versions("v2", "v2");
    config.activate_immediately = true;
    registration.register(worker(&network, &store, config)).await.unwrap();
    assert_eq!(store.keys().await.unwrap(), vec!["precache-v2", "runtime-v2"]);

    hold.release();
    let outcome = pending.await.unwrap();

    assert_eq!(outcome.source(), ResponseSource::Network);
    assert_eq!(store.keys().await.unwrap(), vec!["precache-v2", "runtime-v2"]);
}

async fn image_cache_first(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    network.serve(&at("/img/a.png"), 200, "image/png", "first");
    registration.fetch(&image("/img/a.png")).await;
    network.reset_calls();

    let served = registration.fetch(&image("/img/a.png")).await;

    assert_eq!(network.calls(), 0);
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body.as_ref(), b"first");
}

async fn image_miss_populates(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    network.serve(&at("/img/b.png"), 200, "image/png", "b");

    let served = registration.fetch(&image("/img/b.png")).await;

    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(network.calls(), 1);
    assert!(store.match_entry("runtime-v1", &image("/img/b.png").identity()).await.unwrap().is_some());
}

async fn dynamic_network_first(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;

    network.serve(&at("/api/catalog"), 200, "application/json", r#"{"products":["a"]}"#);
    registration.fetch(&catalog()).await;
    network.serve(&at("/api/catalog"), 200, "application/json", r#"{"products":["a","b"]}"#);
    let served = registration.fetch(&catalog()).await;

    assert_eq!(network.calls_to(&at("/api/catalog")), 2);
    assert_eq!(served.source, ResponseSource::Network);
    let stored = store.match_entry("runtime-v1", &catalog().identity()).await.unwrap().unwrap();
    assert_eq!(stored.body.as_ref(), br#"{"products":["a","b"]}"#);
}

async fn offline_empty_catalog(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    network.set_offline(true);

    let served = registration.fetch(&catalog()).await;

    assert_eq!(served.source, ResponseSource::Synthetic);
    assert_eq!(served.response.body.as_ref(), EMPTY_CATALOG_JSON.as_bytes());
    assert_eq!(served.response.content_type(), Some("application/json"));
}

async fn offline_stale_catalog(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    network.serve(&at("/api/catalog"), 200, "application/json", r#"{"products":["a"]}"#);
    registration.fetch(&catalog()).await;
    network.set_offline(true);

    let served = registration.fetch(&catalog()).await;

    assert_eq!(served.source, ResponseSource::StaleCache);
    assert_eq!(served.response.body.as_ref(), br#"{"products":["a"]}"#);
}

async fn excluded_never_stored(store: Arc<dyn CacheStore>) {
    let network = Arc::new(FakeNetwork::new());
    network.serve_shell();
    network.serve(&at("/api/catalog"), 200, "application/json", "{}");
    network.serve(&at("/api/cart"), 500, "text/plain", "boom");
    let registration = Registration::new(network.clone());
    let engine = worker(&network, &store, WorkerConfig::api_passthrough(origin()));
    registration.register(engine.clone()).await.unwrap();

    let ok = registration.fetch(&catalog()).await;
    let failed = registration.fetch(&Request::get(origin().join("/api/cart").unwrap())).await;
    let report = engine.prefetch(&["/api/catalog".to_string()]).await;

    assert_eq!(ok.source, ResponseSource::PassThrough);
    assert_eq!(failed.response.status, 500);
    assert_eq!(report.skipped, 1);
    assert!(store.entries("runtime-v1").await.unwrap().is_empty());
}

async fn prefetch_isolation(store: Arc<dyn CacheStore>) {
    let (network, registration) = online(&store).await;
    let urls: Vec<String> = (1..=5).map(|i| format!("/img/{i}.png")).collect();
    for url in &urls {
        network.serve(&at(url), 200, "image/png", url.clone());
    }
    network.unreachable(&at("/img/3.png"));

    assert!(registration.post_message(json!({"type": "CACHE_URLS", "urls": urls})).await);
    registration.settle().await;

    let cached = store.entries("runtime-v1").await.unwrap();
    let cached: Vec<&str> = cached.iter().map(|id| id.url()).collect();
    assert_eq!(
        cached,
        vec![at("/img/1.png"), at("/img/2.png"), at("/img/4.png"), at("/img/5.png")]
    );
}

macro_rules! on_both_stores {
    ($($name:ident),* $(,)?) => {
        mod memory_store {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::memory()).await;
                }
            )*
        }

        mod sqlite_store {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::sqlite().await).await;
                }
            )*
        }
    };
}

on_both_stores!(
    install_atomicity,
    generation_cleanup,
    late_write_after_update,
    image_cache_first,
    image_miss_populates,
    dynamic_network_first,
    offline_empty_catalog,
    offline_stale_catalog,
    excluded_never_stored,
    prefetch_isolation,
);
