//! Request classification.
//!
//! Classification is a pure function of the request and the routing rules:
//! it never touches the cache or the network, so it is cheap to call on
//! every intercepted request.

use std::fmt;

use url::Url;
use vitrine_core::url::same_origin;
use vitrine_core::{Destination, Request, config::RoutingRules};

/// Which strategy answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Navigation and static assets, backed by the precache.
    Shell,
    /// Images, cache-first.
    Image,
    /// Catalog data, network-first with an offline fallback.
    DynamicData,
    /// Never intercepted.
    Excluded,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceClass::Shell => "shell",
            ResourceClass::Image => "image",
            ResourceClass::DynamicData => "dynamic-data",
            ResourceClass::Excluded => "excluded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    rules: RoutingRules,
}

impl Router {
    pub fn new(origin: Url, rules: RoutingRules) -> Self {
        Self { origin, rules }
    }

    /// Classify an intercepted request.
    ///
    /// Rules apply in order: non-`GET` and excluded prefixes pass through,
    /// then images, then dynamic-data patterns, and everything else is shell.
    pub fn classify(&self, request: &Request) -> ResourceClass {
        // Only GET responses can be stored.
        if !request.method.eq_ignore_ascii_case("GET") {
            return ResourceClass::Excluded;
        }

        if self.is_excluded(&request.url) {
            return ResourceClass::Excluded;
        }

        if request.destination == Destination::Image {
            return ResourceClass::Image;
        }

        if self.is_dynamic(&request.url) {
            return ResourceClass::DynamicData;
        }

        ResourceClass::Shell
    }

    fn is_excluded(&self, url: &Url) -> bool {
        same_origin(url, &self.origin)
            && self
                .rules
                .excluded_prefixes
                .iter()
                .any(|prefix| url.path().starts_with(prefix.as_str()))
    }

    fn is_dynamic(&self, url: &Url) -> bool {
        self.rules.cache_dynamic_data && self.rules.dynamic_patterns.iter().any(|pattern| url.as_str().contains(pattern.as_str()))
    }
}
