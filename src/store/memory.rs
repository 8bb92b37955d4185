//! In-memory Store
//!
//! HashMap-backed store with a per-store insertion-order queue.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{RequestKey, StoredEntry, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use crate::store::{BodyStream, CacheStore, StoreHandle};

// == Named Store ==
/// Entries of one named store plus their insertion order.
#[derive(Debug, Default)]
struct NamedStore {
    entries: HashMap<RequestKey, StoredEntry>,
    /// Front = oldest insert
    order: VecDeque<RequestKey>,
}

impl NamedStore {
    fn insert(&mut self, key: RequestKey, entry: StoredEntry) {
        if self.entries.insert(key.clone(), entry).is_some() {
            self.order.retain(|k| *k != key);
        }
        self.order.push_back(key);
    }

    fn remove(&mut self, key: &RequestKey) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    stores: HashMap<String, NamedStore>,
    /// Store names in creation order
    names: Vec<String>,
}

// == Memory Store ==
/// Ephemeral store for tests and single-process use.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    chunk_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Store whose bodies stream in chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            chunk_size,
        }
    }

    /// Number of entries in a store, zero if it does not exist.
    pub async fn len(&self, store_name: &str) -> usize {
        let inner = self.inner.read().await;
        inner
            .stores
            .get(store_name)
            .map(|s| s.entries.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, store_name: &str) -> Result<StoreHandle> {
        let mut inner = self.inner.write().await;
        if !inner.stores.contains_key(store_name) {
            inner.stores.insert(store_name.to_string(), NamedStore::default());
            inner.names.push(store_name.to_string());
        }
        Ok(StoreHandle::new(store_name))
    }

    async fn lookup(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<StoredEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stores
            .get(handle.name())
            .and_then(|s| s.entries.get(key))
            .cloned())
    }

    async fn put(&self, handle: &StoreHandle, key: &RequestKey, entry: StoredEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.stores.contains_key(handle.name()) {
            inner.names.push(handle.name().to_string());
        }
        inner
            .stores
            .entry(handle.name().to_string())
            .or_default()
            .insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, handle: &StoreHandle, key: &RequestKey) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .stores
            .get_mut(handle.name())
            .map(|s| s.remove(key))
            .unwrap_or(false))
    }

    async fn keys(&self, handle: &StoreHandle) -> Result<Vec<RequestKey>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stores
            .get(handle.name())
            .map(|s| s.order.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn open_body(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<BodyStream>> {
        let inner = self.inner.read().await;
        Ok(inner
            .stores
            .get(handle.name())
            .and_then(|s| s.entries.get(key))
            .map(|entry| entry.response.body_chunks(self.chunk_size)))
    }

    async fn delete_store(&self, store_name: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let existed = inner.stores.remove(store_name).is_some();
        inner.names.retain(|n| n != store_name);
        Ok(existed)
    }

    async fn list_store_names(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.names.clone())
    }
}
