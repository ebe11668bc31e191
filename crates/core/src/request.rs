//! Intercepted requests and the identities used to address cached entries.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// What the page intends to do with the response.
///
/// Mirrors the `destination` a browser attaches to every outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// `fetch()`/XHR traffic and anything else without a destination.
    #[default]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// Request mode, as far as caching cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    #[default]
    Cors,
    SameOrigin,
    /// Cross-origin fetch whose response may not be inspected ("opaque").
    NoCors,
}

/// An outbound request seen by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// A plain `GET` with no destination.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Empty, mode: RequestMode::Cors, headers: Vec::new() }
    }

    /// A top-level navigation to `url`.
    pub fn navigate(url: Url) -> Self {
        Self { destination: Destination::Document, mode: RequestMode::Navigate, ..Self::get(url) }
    }

    /// An `<img>` load of `url`.
    pub fn image(url: Url) -> Self {
        Self { destination: Destination::Image, mode: RequestMode::NoCors, ..Self::get(url) }
    }

    /// A blind (no-cors) `GET`, as issued for prefetch warm-ups.
    pub fn opaque(url: Url) -> Self {
        Self { mode: RequestMode::NoCors, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, &self.url)
    }
}

/// Canonical key of a cache entry: method plus absolute URL.
///
/// The query string is significant; the fragment never is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    method: String,
    url: String,
}

impl RequestIdentity {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    /// Identity of a `GET` for `url`.
    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stable content-addressed key for storage backends.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }

    /// Rebuild an identity from stored parts without reparsing the URL.
    pub(crate) fn from_parts(method: String, url: String) -> Self {
        Self { method, url }
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
