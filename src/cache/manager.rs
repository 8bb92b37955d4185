//! Cache Manager
//!
//! Runs the caching strategies against an injected store and fetcher, and
//! exposes the maintenance operations (sweep, size, clear).

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::size::stream_len;
use crate::cache::{
    CacheConfig, CacheRegistry, CacheStats, CacheStrategy, CategorySize, Clock, EvictionPolicy,
    ExpirationTracker, FifoEviction, HttpResponse, RequestCoalescer, RequestKey, StoredEntry,
};
use crate::error::{CacheError, Result};
use crate::fetch::Fetcher;
use crate::store::{CacheStore, StoreHandle};

// == Cache Manager ==
/// Orchestrates lookups, fetches and persists for every cache category.
///
/// Cheap to clone; clones share the store, fetcher, policy and stats.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    eviction: Arc<dyn EvictionPolicy>,
    expiration: ExpirationTracker,
    stats: Arc<Mutex<CacheStats>>,
    coalescer: Option<RequestCoalescer>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager with FIFO eviction, the system clock and no request
    /// coalescing.
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            eviction: Arc::new(FifoEviction),
            expiration: ExpirationTracker::default(),
            stats: Arc::new(Mutex::new(CacheStats::new())),
            coalescer: None,
        }
    }

    pub fn with_eviction_policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.eviction = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.expiration = ExpirationTracker::new(clock);
        self
    }

    /// Shares one network fetch between concurrent identical requests.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalescer = enabled.then(RequestCoalescer::new);
        self
    }

    pub fn eviction_policy(&self) -> &str {
        self.eviction.name()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    // == Strategies ==
    /// Runs `strategy` for `key` under `config`.
    pub async fn execute(
        &self,
        strategy: CacheStrategy,
        key: &RequestKey,
        config: &CacheConfig,
    ) -> Result<HttpResponse> {
        match strategy {
            CacheStrategy::CacheFirst => self.cache_first(key, config).await,
            CacheStrategy::NetworkFirst => self.network_first(key, config).await,
            CacheStrategy::StaleWhileRevalidate => self.stale_while_revalidate(key, config).await,
        }
    }

    /// Serves a cached entry if one exists; otherwise fetches, caching 2xx
    /// responses. A hit never touches the network, however old the entry.
    pub async fn cache_first(&self, key: &RequestKey, config: &CacheConfig) -> Result<HttpResponse> {
        if let Some(cached) = self.lookup(key, config).await {
            return Ok(cached);
        }
        self.fetch_and_store(key, config).await
    }

    /// Fetches first; on a network error serves the cached entry if any,
    /// otherwise returns the original error.
    pub async fn network_first(
        &self,
        key: &RequestKey,
        config: &CacheConfig,
    ) -> Result<HttpResponse> {
        match self.fetch_and_store(key, config).await {
            Err(err) if err.is_network() => match self.lookup(key, config).await {
                Some(cached) => {
                    debug!("Network failed for {}, serving cached copy", key);
                    Ok(cached)
                }
                None => Err(err),
            },
            other => other,
        }
    }

    /// Serves a cached entry immediately while a detached task refreshes it.
    /// With no cached entry, waits for the refresh and returns its outcome.
    pub async fn stale_while_revalidate(
        &self,
        key: &RequestKey,
        config: &CacheConfig,
    ) -> Result<HttpResponse> {
        let cached = self.lookup(key, config).await;

        let manager = self.clone();
        let task_key = key.clone();
        let task_config = config.clone();
        let revalidation = tokio::spawn(async move {
            let result = manager.fetch_and_store(&task_key, &task_config).await;
            if let Err(err) = &result {
                warn!("Background revalidation of {} failed: {}", task_key, err);
            }
            result
        });

        match cached {
            Some(cached) => Ok(cached),
            None => revalidation
                .await
                .map_err(|e| CacheError::Internal(format!("Revalidation task failed: {}", e)))?,
        }
    }

    // == Maintenance ==
    /// Deletes every entry whose age exceeds its max age. Entries without
    /// expiration metadata are left alone. Returns the number deleted.
    pub async fn clean_expired_entries(&self, config: &CacheConfig) -> Result<usize> {
        let handle = self.open(config).await?;
        let keys = self.store.keys(&handle).await?;

        let mut removed = 0;
        for key in keys {
            let entry = match self.store.lookup(&handle, &key).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Sweep skipped {} in {}: {}", key, handle.name(), err);
                    continue;
                }
            };

            if self.expiration.is_expired(&entry) && self.store.delete(&handle, &key).await? {
                self.eviction.record_removal(handle.name(), &key);
                removed += 1;
            }
        }

        if removed > 0 {
            self.stats.lock().record_expired(removed);
            info!("Expired {} entries from {}", removed, handle.name());
        }
        Ok(removed)
    }

    /// Runs [`clean_expired_entries`](Self::clean_expired_entries) for every
    /// registered category. Failing categories are logged and skipped.
    pub async fn sweep_registered(&self, registry: &CacheRegistry) -> Vec<(String, usize)> {
        let mut results = Vec::with_capacity(registry.len());
        for (category, config) in registry.iter() {
            match self.clean_expired_entries(config).await {
                Ok(removed) => results.push((category.to_string(), removed)),
                Err(err) => warn!("Sweep of {} failed: {}", category, err),
            }
        }
        results
    }

    /// Total stored body bytes for `config`, streamed entry by entry.
    /// Unreadable bodies are logged and left out of the total.
    pub async fn get_cache_size(&self, config: &CacheConfig) -> Result<u64> {
        let handle = self.open(config).await?;
        let keys = self.store.keys(&handle).await?;

        let mut total = 0u64;
        for key in keys {
            let body = match self.store.open_body(&handle, &key).await {
                Ok(Some(body)) => body,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Size scan skipped {} in {}: {}", key, handle.name(), err);
                    continue;
                }
            };
            match stream_len(body).await {
                Ok(len) => total += len,
                Err(err) => warn!("Size scan skipped {} in {}: {}", key, handle.name(), err),
            }
        }
        Ok(total)
    }

    pub async fn entry_count(&self, config: &CacheConfig) -> Result<usize> {
        let handle = self.open(config).await?;
        Ok(self.store.keys(&handle).await?.len())
    }

    /// Size and entry count of every registered category.
    pub async fn category_sizes(&self, registry: &CacheRegistry) -> Result<Vec<CategorySize>> {
        let mut sizes = Vec::with_capacity(registry.len());
        for (category, config) in registry.iter() {
            sizes.push(CategorySize {
                category: category.to_string(),
                store_name: config.store_name(),
                size_bytes: self.get_cache_size(config).await?,
                entries: self.entry_count(config).await?,
            });
        }
        Ok(sizes)
    }

    /// Deletes the current generation of `config`'s store.
    pub async fn clear_cache(&self, config: &CacheConfig) -> Result<bool> {
        let name = config.store_name();
        let existed = self.store.delete_store(&name).await?;
        self.eviction.forget_store(&name);
        info!("Cleared cache {}", name);
        Ok(existed)
    }

    /// Deletes every store the backend holds, including ones this crate did
    /// not create. Returns the deleted store names.
    pub async fn clear_all_caches(&self) -> Result<Vec<String>> {
        let names = self.store.list_store_names().await?;
        self.delete_stores(names).await
    }

    /// Deletes only stores belonging to registered categories, any version.
    pub async fn clear_registered_caches(&self, registry: &CacheRegistry) -> Result<Vec<String>> {
        let names = self
            .store
            .list_store_names()
            .await?
            .into_iter()
            .filter(|name| registry.owns_store(name))
            .collect();
        self.delete_stores(names).await
    }

    async fn delete_stores(&self, names: Vec<String>) -> Result<Vec<String>> {
        let mut deleted = Vec::with_capacity(names.len());
        for name in names {
            if self.store.delete_store(&name).await? {
                self.eviction.forget_store(&name);
                deleted.push(name);
            }
        }
        info!("Cleared {} caches", deleted.len());
        Ok(deleted)
    }

    // == Internals ==
    async fn open(&self, config: &CacheConfig) -> Result<StoreHandle> {
        self.store.open(&config.store_name()).await
    }

    /// Cache lookup. Read failures count as misses.
    async fn lookup(&self, key: &RequestKey, config: &CacheConfig) -> Option<HttpResponse> {
        let found = match self.open(config).await {
            Ok(handle) => match self.store.lookup(&handle, key).await {
                Ok(found) => found,
                Err(err) => {
                    warn!("Cache read for {} failed, treating as miss: {}", key, err);
                    None
                }
            },
            Err(err) => {
                warn!("Opening {} failed, treating as miss: {}", config.store_name(), err);
                None
            }
        };

        match found {
            Some(entry) => {
                debug!("Cache hit for {} in {}", key, config.store_name());
                self.stats.lock().record_hit();
                self.eviction.record_access(&config.store_name(), key);
                Some(entry.response)
            }
            None => {
                debug!("Cache miss for {} in {}", key, config.store_name());
                self.stats.lock().record_miss();
                None
            }
        }
    }

    async fn fetch_and_store(&self, key: &RequestKey, config: &CacheConfig) -> Result<HttpResponse> {
        match &self.coalescer {
            Some(coalescer) => {
                let manager = self.clone();
                let task_key = key.clone();
                let task_config = config.clone();
                coalescer
                    .run(&config.store_name(), key, move || {
                        async move { manager.fetch_and_store_now(&task_key, &task_config).await }
                            .boxed()
                    })
                    .await
            }
            None => self.fetch_and_store_now(key, config).await,
        }
    }

    async fn fetch_and_store_now(
        &self,
        key: &RequestKey,
        config: &CacheConfig,
    ) -> Result<HttpResponse> {
        self.stats.lock().record_fetch();
        let response = self.fetcher.fetch(key).await?;

        if response.is_success() {
            self.persist(key, config, response.clone()).await;
        } else {
            debug!("Not caching {} response for {}", response.status, key);
        }
        Ok(response)
    }

    /// Persist failures are logged and counted, never returned.
    async fn persist(&self, key: &RequestKey, config: &CacheConfig, response: HttpResponse) {
        if let Err(err) = self.try_persist(key, config, response).await {
            self.stats.lock().record_write_failure();
            warn!("Failed to cache {} in {}: {}", key, config.store_name(), err);
        }
    }

    async fn try_persist(
        &self,
        key: &RequestKey,
        config: &CacheConfig,
        response: HttpResponse,
    ) -> Result<()> {
        let handle = self.open(config).await?;

        let keys = self.store.keys(&handle).await?;
        let victims = self
            .eviction
            .select_victims(handle.name(), &keys, config.max_entries);
        for victim in victims {
            if self.store.delete(&handle, &victim).await? {
                self.eviction.record_removal(handle.name(), &victim);
                self.stats.lock().record_eviction();
                debug!("Evicted {} from {}", victim, handle.name());
            }
        }

        let entry = StoredEntry::new(response, self.expiration.stamp(config));
        self.store.put(&handle, key, entry).await?;
        self.eviction.record_insert(handle.name(), key);
        Ok(())
    }
}
