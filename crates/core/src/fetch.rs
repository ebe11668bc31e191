//! Seams between the worker engine and the outside world.
//!
//! The engine never talks to the network or the wall clock directly; hosts
//! inject implementations of these traits, and tests inject fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{CapturedResponse, Error, Request};

/// Performs network requests on behalf of the worker.
///
/// Any HTTP status is a successful fetch. Implementations return `Err` only
/// when no response was obtained at all (see [`Error::is_transport`]).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error>;
}

/// Source of timestamps for captured entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
