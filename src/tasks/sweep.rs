//! Expiration Sweep Task
//!
//! Background task that periodically removes expired entries from every
//! registered cache category.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, CacheRegistry};

/// Shortest allowed pause between sweeps, in seconds
pub const MIN_SWEEP_INTERVAL_SECS: u64 = 1;

/// Sweep pause for a configured interval; zero is raised to the minimum.
fn sweep_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(MIN_SWEEP_INTERVAL_SECS))
}

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Strategies never sweep on their own, so without this task
/// (or an explicit sweep through the API) stale entries stay servable.
///
/// # Arguments
/// * `manager` - Cache manager to sweep through
/// * `registry` - Categories to sweep
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_sweep_task(
    manager: CacheManager,
    registry: CacheRegistry,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    if sweep_interval_secs < MIN_SWEEP_INTERVAL_SECS {
        warn!(
            "Sweep interval {}s is below the minimum, using {}s",
            sweep_interval_secs, MIN_SWEEP_INTERVAL_SECS
        );
    }
    let interval = sweep_interval(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiration sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed: usize = manager
                .sweep_registered(&registry)
                .await
                .iter()
                .map(|(_, n)| n)
                .sum();

            if removed > 0 {
                info!("Expiration sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, HttpResponse, RequestKey};
    use crate::error::Result;
    use crate::fetch::Fetcher;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OkFetcher;

    #[async_trait]
    impl Fetcher for OkFetcher {
        async fn fetch(&self, _request: &RequestKey) -> Result<HttpResponse> {
            Ok(HttpResponse::new(200, "ok"))
        }
    }

    fn registry(max_age: Duration) -> CacheRegistry {
        let mut registry = CacheRegistry::new();
        registry.register("api", CacheConfig::new("api-data", "1", max_age, 10));
        registry
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let registry = registry(Duration::from_millis(200));
        let config = registry.get("api").unwrap().clone();
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), Arc::new(OkFetcher));

        manager
            .cache_first(&RequestKey::get("expire_soon"), &config)
            .await
            .unwrap();

        let handle = spawn_sweep_task(manager.clone(), registry, 1);

        // Wait for the entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(manager.entry_count(&config).await.unwrap(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let registry = registry(Duration::from_secs(3600));
        let config = registry.get("api").unwrap().clone();
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), Arc::new(OkFetcher));

        manager
            .cache_first(&RequestKey::get("long_lived"), &config)
            .await
            .unwrap();

        let handle = spawn_sweep_task(manager.clone(), registry, 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(manager.entry_count(&config).await.unwrap(), 1);
        handle.abort();
    }

    #[test]
    fn test_zero_interval_is_raised_to_minimum() {
        assert_eq!(sweep_interval(0), Duration::from_secs(1));
        assert_eq!(sweep_interval(1), Duration::from_secs(1));
        assert_eq!(sweep_interval(60), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_interval_waits_before_first_sweep() {
        let registry = registry(Duration::from_millis(10));
        let config = registry.get("api").unwrap().clone();
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), Arc::new(OkFetcher));
        manager
            .cache_first(&RequestKey::get("short_lived"), &config)
            .await
            .unwrap();

        let handle = spawn_sweep_task(manager.clone(), registry, 0);
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Expired, but a one second pause means no sweep has run yet
        assert_eq!(manager.entry_count(&config).await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(manager.entry_count(&config).await.unwrap(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), Arc::new(OkFetcher));
        let handle = spawn_sweep_task(manager, CacheRegistry::builtin(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
