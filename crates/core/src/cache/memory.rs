//! In-memory cache store.
//!
//! Uses a HashMap per generation behind a tokio RwLock. Nothing survives
//! the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStore;
use crate::{CapturedResponse, Error, RequestIdentity};

type Generation = HashMap<RequestIdentity, CapturedResponse>;

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    generations: HashMap<String, Generation>,
}

impl Inner {
    fn open(&mut self, name: &str) -> &mut Generation {
        if !self.generations.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.generations.entry(name.to_string()).or_default()
    }
}

/// Cache store kept entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.inner.write().await.open(generation);
        Ok(())
    }

    async fn has(&self, generation: &str) -> Result<bool, Error> {
        Ok(self.inner.read().await.generations.contains_key(generation))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|name| name != generation);
        Ok(inner.generations.remove(generation).is_some())
    }

    async fn match_entry(
        &self, generation: &str, identity: &RequestIdentity,
    ) -> Result<Option<CapturedResponse>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .generations
            .get(generation)
            .and_then(|entries| entries.get(identity))
            .cloned())
    }

    async fn put(
        &self, generation: &str, identity: &RequestIdentity, response: &CapturedResponse,
    ) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        let target = inner
            .generations
            .get_mut(generation)
            .ok_or_else(|| Error::MissingGeneration(generation.to_string()))?;
        target.insert(identity.clone(), response.clone());
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: &[(RequestIdentity, CapturedResponse)]) -> Result<(), Error> {
        // A single write guard makes the batch visible all at once.
        let mut inner = self.inner.write().await;
        let target = inner.open(generation);
        for (identity, response) in entries {
            target.insert(identity.clone(), response.clone());
        }
        Ok(())
    }

    async fn entries(&self, generation: &str) -> Result<Vec<RequestIdentity>, Error> {
        let inner = self.inner.read().await;
        let mut ids: Vec<RequestIdentity> = inner
            .generations
            .get(generation)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_by(|a, b| a.url().cmp(b.url()).then_with(|| a.method().cmp(b.method())));
        Ok(ids)
    }
}
