//! Fakes for exercising the engine without a network or a wall clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::{Notify, Semaphore};
use url::Url;
use vitrine_core::{CacheStore, CapturedResponse, Clock, Error, Fetcher, Request, RequestIdentity, ResponseKind};

/// Origin used by the fakes.
pub const ORIGIN: &str = "http://shop.test";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap_or_else(|e| panic!("bad test origin: {e}"))
}

/// Absolute URL on the test origin.
pub fn at(path: &str) -> String {
    origin().join(path).map(|u| u.to_string()).unwrap_or_else(|e| panic!("bad test path {path}: {e}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, content_type: String, body: Bytes },
    Unreachable,
}

/// A request parked inside [`FakeNetwork::fetch`] until released.
pub struct Hold {
    entered: Notify,
    release: Semaphore,
}

impl Hold {
    fn new() -> Self {
        Self { entered: Notify::new(), release: Semaphore::new(0) }
    }

    /// Wait until the held request reached the network.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held request complete.
    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

/// Scripted network keyed by absolute URL.
///
/// Unknown URLs are unreachable. Every call is recorded, including failed ones.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    holds: Mutex<HashMap<String, Arc<Hold>>>,
    offline: AtomicBool,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with the given status, content type and body.
    pub fn serve(&self, url: &str, status: u16, content_type: &str, body: impl Into<Bytes>) {
        lock(&self.routes).insert(
            url.to_string(),
            Route::Respond { status, content_type: content_type.to_string(), body: body.into() },
        );
    }

    /// Make `url` fail at the transport level.
    pub fn unreachable(&self, url: &str) {
        lock(&self.routes).insert(url.to_string(), Route::Unreachable);
    }

    /// Park requests to `url` until the returned hold is released.
    pub fn hold(&self, url: &str) -> Arc<Hold> {
        let hold = Arc::new(Hold::new());
        lock(&self.holds).insert(url.to_string(), Arc::clone(&hold));
        hold
    }

    /// Fail every request while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Serve the default app shell: `/`, `/index.html` and the manifest.
    pub fn serve_shell(&self) {
        self.serve(&at("/"), 200, "text/html", "<!doctype html><title>shop</title>");
        self.serve(&at("/index.html"), 200, "text/html", "<!doctype html><title>shop</title>");
        self.serve(&at("/manifest.webmanifest"), 200, "application/manifest+json", r#"{"name":"shop"}"#);
    }

    pub fn calls(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        lock(&self.calls).iter().filter(|u| u.as_str() == url).count()
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error> {
        let url = request.url.to_string();
        lock(&self.calls).push(url.clone());

        let hold = lock(&self.holds).get(&url).cloned();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            let _permit = hold.release.acquire().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!("offline: {url}")));
        }

        let route = lock(&self.routes).get(&url).cloned();
        match route {
            Some(Route::Respond { status, content_type, body }) => Ok(CapturedResponse {
                url,
                status,
                headers: vec![("content-type".into(), content_type)],
                body,
                kind: ResponseKind::Basic,
                captured_at: Utc::now(),
            }),
            Some(Route::Unreachable) | None => Err(Error::Transport(format!("unreachable: {url}"))),
        }
    }
}

/// Clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// 2024-01-01T00:00:00Z.
    pub fn epoch() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Store whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrokenStore;

fn broken() -> Error {
    Error::MigrationFailed("store unavailable".into())
}

#[async_trait]
impl CacheStore for BrokenStore {
    async fn open(&self, _generation: &str) -> Result<(), Error> {
        Err(broken())
    }

    async fn has(&self, _generation: &str) -> Result<bool, Error> {
        Err(broken())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Err(broken())
    }

    async fn delete(&self, _generation: &str) -> Result<bool, Error> {
        Err(broken())
    }

    async fn match_entry(
        &self, _generation: &str, _identity: &RequestIdentity,
    ) -> Result<Option<CapturedResponse>, Error> {
        Err(broken())
    }

    async fn put(
        &self, _generation: &str, _identity: &RequestIdentity, _response: &CapturedResponse,
    ) -> Result<(), Error> {
        Err(broken())
    }

    async fn put_all(&self, _generation: &str, _entries: &[(RequestIdentity, CapturedResponse)]) -> Result<(), Error> {
        Err(broken())
    }

    async fn entries(&self, _generation: &str) -> Result<Vec<RequestIdentity>, Error> {
        Err(broken())
    }
}
