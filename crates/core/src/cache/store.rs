//! The cache store contract shared by all backends.

use async_trait::async_trait;

use crate::{CapturedResponse, Error, RequestIdentity};

/// A set of named generations of captured responses.
///
/// Per-key reads and writes are atomic; concurrent writers to the same
/// identity resolve last-writer-wins. Nothing in this trait evicts single
/// entries: an entry disappears only when its generation is deleted.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Whether a generation with this name exists.
    async fn has(&self, generation: &str) -> Result<bool, Error>;

    /// Names of all existing generations, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and every entry in it. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// Look up an entry. A missing generation is simply a miss.
    async fn match_entry(&self, generation: &str, identity: &RequestIdentity)
    -> Result<Option<CapturedResponse>, Error>;

    /// Insert or overwrite a single entry.
    ///
    /// The generation must already exist; a deleted generation is never
    /// brought back by a late write. Fails with `Error::MissingGeneration`.
    async fn put(&self, generation: &str, identity: &RequestIdentity, response: &CapturedResponse)
    -> Result<(), Error>;

    /// Insert a batch of entries atomically, creating the generation if needed:
    /// either all become visible or none.
    async fn put_all(&self, generation: &str, entries: &[(RequestIdentity, CapturedResponse)]) -> Result<(), Error>;

    /// Identities stored in a generation, ordered by URL.
    async fn entries(&self, generation: &str) -> Result<Vec<RequestIdentity>, Error>;
}
