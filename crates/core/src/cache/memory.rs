//! Process-local storage backend.
//!
//! Stores live only as long as the backend value. Used when no database path
//! is configured and throughout the test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RequestKey, StorageBackend};
use crate::Error;
use crate::types::Response;

type Store = HashMap<RequestKey, Response>;

/// In-memory cache stores keyed by name.
///
/// Uses a `BTreeMap` of stores so namespace listing is deterministic.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    stores: Arc<RwLock<BTreeMap<String, Store>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn open(&self, store: &str) -> Result<(), Error> {
        self.stores.write().await.entry(store.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.get(store).and_then(|s| s.get(key)).cloned())
    }

    async fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        stores
            .entry(store.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn put_all(&self, store: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        let target = stores.entry(store.to_string()).or_default();
        for (key, response) in entries {
            target.insert(key.clone(), response.clone());
        }
        Ok(())
    }

    async fn keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
        let stores = self.stores.read().await;
        let mut keys: Vec<RequestKey> = stores.get(store).map(|s| s.keys().cloned().collect()).unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete_namespace(&self, store: &str) -> Result<bool, Error> {
        Ok(self.stores.write().await.remove(store).is_some())
    }
}
