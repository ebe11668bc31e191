//! Core types and shared functionality for vitrine.
//!
//! This crate provides:
//! - Request/response model and request identities
//! - Generation-aware cache stores (in-memory and SQLite)
//! - The `Fetcher` and `Clock` seams the worker engine is built on
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod request;
pub mod response;
pub mod url;

pub use cache::{CacheStore, MemoryStore, SqliteStore};
pub use config::{AppConfig, ConfigError, StoreKind, WorkerConfig};
pub use error::Error;
pub use fetch::{Clock, Fetcher, SystemClock};
pub use request::{Destination, Request, RequestIdentity, RequestMode};
pub use response::{CapturedResponse, ResponseKind};
