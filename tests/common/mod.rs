//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use response_cache::cache::{HttpResponse, RequestKey, StoredEntry};
use response_cache::fetch::Fetcher;
use response_cache::store::{BodyStream, CacheStore, MemoryStore, StoreHandle};
use response_cache::{CacheError, Result};

/// Shared, ordered record of store and fetch calls.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Respond(u16, Vec<u8>),
    Fail,
}

// == Scripted Fetcher ==
/// Fetcher with per-URL outcomes. Unscripted URLs answer 200 with the URL
/// as body.
pub struct ScriptedFetcher {
    outcomes: Mutex<HashMap<String, Outcome>>,
    calls: AtomicUsize,
    /// When set, each fetch waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
    log: Option<EventLog>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            log: None,
        }
    }

    /// Fetches block until `gate` hands out a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn logging(log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::new()
        }
    }

    pub fn script(&self, url: &str, outcome: Outcome) {
        self.outcomes.lock().insert(url.to_string(), outcome);
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.script(url, Outcome::Respond(status, body.as_bytes().to_vec()));
    }

    pub fn fail(&self, url: &str) {
        self.script(url, Outcome::Fail);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &RequestKey) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().push(format!("fetch {}", request.url));
        }
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| CacheError::Network(e.to_string()))?
                .forget();
        }

        let outcome = self.outcomes.lock().get(&request.url).cloned();
        match outcome {
            Some(Outcome::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Outcome::Fail) => Err(CacheError::Network(format!(
                "connection refused: {}",
                request.url
            ))),
            None => Ok(HttpResponse::new(200, request.url.clone())),
        }
    }
}

// == Recording Store ==
/// MemoryStore wrapper that logs lookups into an [`EventLog`].
pub struct RecordingStore {
    pub inner: MemoryStore,
    log: EventLog,
}

impl RecordingStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: MemoryStore::new(),
            log,
        }
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn open(&self, store_name: &str) -> Result<StoreHandle> {
        self.inner.open(store_name).await
    }

    async fn lookup(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<StoredEntry>> {
        self.log.lock().push(format!("lookup {}", key.url));
        self.inner.lookup(handle, key).await
    }

    async fn put(&self, handle: &StoreHandle, key: &RequestKey, entry: StoredEntry) -> Result<()> {
        self.log.lock().push(format!("put {}", key.url));
        self.inner.put(handle, key, entry).await
    }

    async fn delete(&self, handle: &StoreHandle, key: &RequestKey) -> Result<bool> {
        self.inner.delete(handle, key).await
    }

    async fn keys(&self, handle: &StoreHandle) -> Result<Vec<RequestKey>> {
        self.inner.keys(handle).await
    }

    async fn open_body(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<BodyStream>> {
        self.inner.open_body(handle, key).await
    }

    async fn delete_store(&self, store_name: &str) -> Result<bool> {
        self.inner.delete_store(store_name).await
    }

    async fn list_store_names(&self) -> Result<Vec<String>> {
        self.inner.list_store_names().await
    }
}
