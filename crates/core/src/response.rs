//! Captured responses: what the cache stores and what strategies return.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Body of the synthetic offline catalog document.
pub const EMPTY_CATALOG_JSON: &str = r#"{"products":[],"settings":{"categoriesOrder":[]}}"#;

/// How much of the response the page is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin or CORS response.
    Basic,
    /// Result of a no-cors cross-origin fetch; stored blind.
    Opaque,
    /// Synthetic network error, produced when neither network nor cache can answer.
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "opaque" => Some(ResponseKind::Opaque),
            "error" => Some(ResponseKind::Error),
            _ => None,
        }
    }
}

/// A response body plus its status and headers.
///
/// Stored whole; a refresh replaces the entry, it never patches it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResponse {
    /// URL the response was produced for.
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
    pub captured_at: DateTime<Utc>,
}

impl CapturedResponse {
    /// The equivalent of `Response.error()`.
    pub fn network_error(url: &str, at: DateTime<Utc>) -> Self {
        Self { url: url.to_string(), status: 0, headers: Vec::new(), body: Bytes::new(), kind: ResponseKind::Error, captured_at: at }
    }

    /// A `200 OK` JSON document.
    pub fn json(url: &str, body: impl Into<Bytes>, at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            status: 200,
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.into(),
            kind: ResponseKind::Basic,
            captured_at: at,
        }
    }

    /// The well-formed, empty catalog served when the catalog endpoint is
    /// unreachable and nothing was cached.
    pub fn empty_catalog(url: &str, at: DateTime<Utc>) -> Self {
        Self::json(url, EMPTY_CATALOG_JSON, at)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }
}
