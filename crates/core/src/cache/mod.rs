//! Generation-aware response cache.
//!
//! A cache store holds named generations, each a map from request identity to
//! captured response. Two backends are provided:
//!
//! - [`MemoryStore`] for tests and ephemeral hosts
//! - [`SqliteStore`], persistent, with async access via tokio-rusqlite,
//!   content-addressed keys (SHA-256), automatic migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::SqliteStore;
pub use memory::MemoryStore;
pub use store::CacheStore;
