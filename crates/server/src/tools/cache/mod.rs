//! Cache-related MCP tools.
//!
//! This module provides read access to the generations in the cache store.

pub mod list;

pub use list::{CacheListParams, list_impl};
