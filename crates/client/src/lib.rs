//! Network client for vitrine.
//!
//! This crate provides the reqwest-backed [`Fetcher`](vitrine_core::Fetcher)
//! that hosts inject into the worker engine.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher};
