//! sw_fetch tool implementation.
//!
//! Sends a request through the controlling worker, the way a page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vitrine_core::url::resolve;
use vitrine_core::{Destination, Error, Request};

use super::json_result;
use crate::host::Host;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request, absolute or relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request destination: "image", "document", "script", ... (default: none).
    #[serde(default)]
    pub destination: Option<String>,

    /// Treat the request as a top-level navigation.
    #[serde(default)]
    pub navigate: bool,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// HTTP status; 0 for a network error.
    pub status: u16,
    /// "basic", "opaque" or "error".
    pub kind: String,
    pub content_type: Option<String>,
    /// Where the response came from: "network", "cache", "stale-cache", "synthetic" or "pass-through".
    pub source: String,
    /// ISO8601 timestamp of when the response was captured.
    pub captured_at: String,
    pub body_bytes: usize,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
}

fn build_request(host: &Host, params: &SwFetchParams) -> Result<Request, Error> {
    let url = resolve(host.origin(), &params.url)?;
    let destination = match params.destination.as_deref() {
        Some(raw) => raw.parse::<Destination>()?,
        None => Destination::Empty,
    };

    let request = if params.navigate {
        Request::navigate(url)
    } else if destination == Destination::Image {
        Request::image(url)
    } else {
        Request { destination, ..Request::get(url) }
    };

    Ok(match params.method.as_deref() {
        Some(method) if !method.trim().is_empty() => request.with_method(method.trim()),
        _ => request,
    })
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(host: &Host, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(host, &params)?;
    let served = host.registration().fetch(&request).await;
    tracing::debug!(url = %request.url, source = %served.source, status = served.response.status, "sw_fetch");

    let response = served.response;
    let output = SwFetchOutput {
        url: response.url.clone(),
        status: response.status,
        kind: response.kind.as_str().to_string(),
        content_type: response.content_type().map(str::to_string),
        source: served.source.to_string(),
        captured_at: response.captured_at.to_rfc3339(),
        body_bytes: response.body.len(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{host, output};
    use vitrine_core::response::EMPTY_CATALOG_JSON;
    use vitrine_worker::testing::at;

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: None, destination: None, navigate: false }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (_network, host) = host();
        assert!(fetch_impl(&host, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_unknown_destination() {
        let (_network, host) = host();
        let params = SwFetchParams { destination: Some("video-game".into()), ..params("/a") };
        assert!(fetch_impl(&host, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_offline_catalog() {
        let (network, host) = host();
        host.deploy(None, None).await.unwrap();
        network.set_offline(true);

        let result = fetch_impl(&host, params("/api/catalog")).await.unwrap();
        let out = output(&result);

        assert_eq!(out["source"], "synthetic");
        assert_eq!(out["status"], 200);
        assert_eq!(out["body"], EMPTY_CATALOG_JSON);
    }

    #[tokio::test]
    async fn test_fetch_image_twice() {
        let (network, host) = host();
        host.deploy(None, None).await.unwrap();
        network.serve(&at("/img/a.png"), 200, "image/png", "png");
        let params = SwFetchParams { destination: Some("image".into()), ..params("/img/a.png") };

        let first = output(&fetch_impl(&host, params.clone()).await.unwrap());
        let second = output(&fetch_impl(&host, params).await.unwrap());

        assert_eq!(first["source"], "network");
        assert_eq!(second["source"], "cache");
        assert_eq!(network.calls_to(&at("/img/a.png")), 1);
    }

    #[tokio::test]
    async fn test_fetch_post_passes_through() {
        let (network, host) = host();
        host.deploy(None, None).await.unwrap();
        network.serve(&at("/api/orders"), 201, "application/json", "{}");
        let params = SwFetchParams { method: Some("post".into()), ..params("/api/orders") };

        let out = output(&fetch_impl(&host, params).await.unwrap());

        assert_eq!(out["source"], "pass-through");
        assert_eq!(out["status"], 201);
    }
}
