//! Per-class response strategies.
//!
//! Every strategy resolves to a response or declines. Store failures are
//! logged and treated as misses; only transport failures trigger fallbacks,
//! and an HTTP error status is cached and returned like any other response.

use serde::Serialize;
use vitrine_core::{CapturedResponse, Error, Request, RequestIdentity};

use crate::engine::Engine;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Fresh from the network.
    Network,
    /// Cache hit without touching the network.
    Cache,
    /// Network unreachable; an earlier cached copy was served.
    StaleCache,
    /// Network and cache both unavailable; built by the worker.
    Synthetic,
    /// The worker declined; the host went to the network itself.
    PassThrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::StaleCache => "stale-cache",
            ResponseSource::Synthetic => "synthetic",
            ResponseSource::PassThrough => "pass-through",
        }
    }
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handing a request to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Respond { response: CapturedResponse, source: ResponseSource },
    /// Not intercepted: the host performs the default network request.
    PassThrough,
}

impl FetchOutcome {
    fn respond(response: CapturedResponse, source: ResponseSource) -> Self {
        FetchOutcome::Respond { response, source }
    }

    pub fn response(&self) -> Option<&CapturedResponse> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::PassThrough => None,
        }
    }

    pub fn source(&self) -> ResponseSource {
        match self {
            FetchOutcome::Respond { source, .. } => *source,
            FetchOutcome::PassThrough => ResponseSource::PassThrough,
        }
    }
}

impl Engine {
    /// Look up an entry, treating store errors as a miss.
    pub(crate) async fn lookup(&self, generation: &str, identity: &RequestIdentity) -> Option<CapturedResponse> {
        match self.store.match_entry(generation, identity).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(%identity, generation, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Persist a response, stamping it with the engine clock.
    pub(crate) async fn store_response(&self, generation: &str, identity: &RequestIdentity, response: &CapturedResponse) {
        let stamped = CapturedResponse { captured_at: self.clock.now(), ..response.clone() };
        match self.store.put(generation, identity, &stamped).await {
            Ok(()) => {}
            // Superseded while the fetch was in flight; the generation is gone.
            Err(Error::MissingGeneration(_)) => {
                tracing::debug!(%identity, generation, "generation deleted, dropping late write");
            }
            Err(e) => tracing::warn!(%identity, generation, error = %e, "cache write failed"),
        }
    }

    /// Images: serve the runtime copy if there is one, otherwise fetch and keep it.
    ///
    /// A hit is never revalidated; a new image is expected to get a new URL.
    pub(crate) async fn cache_first(&self, request: &Request) -> FetchOutcome {
        let runtime = self.config.runtime_name();
        let identity = request.identity();

        if let Some(hit) = self.lookup(&runtime, &identity).await {
            tracing::debug!(%identity, "image cache hit");
            return FetchOutcome::respond(hit, ResponseSource::Cache);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_response(&runtime, &identity, &response).await;
                tracing::debug!(%identity, status = response.status, "image cached from network");
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::debug!(%identity, error = %e, "image fetch failed");
                // A concurrent request may have filled the entry meanwhile.
                match self.lookup(&runtime, &identity).await {
                    Some(hit) => FetchOutcome::respond(hit, ResponseSource::StaleCache),
                    None => FetchOutcome::respond(
                        CapturedResponse::network_error(identity.url(), self.clock.now()),
                        ResponseSource::Synthetic,
                    ),
                }
            }
        }
    }

    /// Catalog data: always ask the network, remember the answer, and fall
    /// back to the last answer or to an empty catalog when offline.
    pub(crate) async fn network_first(&self, request: &Request) -> FetchOutcome {
        let runtime = self.config.runtime_name();
        let identity = request.identity();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_response(&runtime, &identity, &response).await;
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(e) => {
                if let Some(stale) = self.lookup(&runtime, &identity).await {
                    tracing::debug!(%identity, error = %e, "offline, serving cached catalog");
                    return FetchOutcome::respond(stale, ResponseSource::StaleCache);
                }
                tracing::debug!(%identity, error = %e, "offline with no cached catalog, serving empty document");
                FetchOutcome::respond(
                    CapturedResponse::empty_catalog(identity.url(), self.clock.now()),
                    ResponseSource::Synthetic,
                )
            }
        }
    }

    /// Shell: answer from the precache when possible.
    ///
    /// Other shell requests go to the network untouched, except navigations,
    /// which fall back to the precached app document when the network is down.
    pub(crate) async fn shell(&self, request: &Request) -> FetchOutcome {
        let precache = self.config.precache_name();
        let identity = request.identity();

        if let Some(hit) = self.lookup(&precache, &identity).await {
            tracing::debug!(%identity, "precache hit");
            return FetchOutcome::respond(hit, ResponseSource::Cache);
        }

        let Some(fallback) = self.navigation_fallback.as_ref().filter(|_| request.is_navigation()) else {
            return FetchOutcome::PassThrough;
        };

        match self.fetcher.fetch(request).await {
            Ok(response) => FetchOutcome::respond(response, ResponseSource::Network),
            Err(e) => match self.lookup(&precache, &RequestIdentity::get(fallback)).await {
                Some(document) => {
                    tracing::debug!(%identity, error = %e, "offline navigation, serving app shell");
                    FetchOutcome::respond(document, ResponseSource::StaleCache)
                }
                None => FetchOutcome::respond(
                    CapturedResponse::network_error(identity.url(), self.clock.now()),
                    ResponseSource::Synthetic,
                ),
            },
        }
    }
}
