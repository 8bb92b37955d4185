//! Response Cache - versioned HTTP response caching proxy
//!
//! Fetches URLs through cache strategies and exposes cache administration
//! endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use response_cache::api::{create_router, AppState};
use response_cache::cache::{CacheManager, CacheRegistry, EvictionPolicy, FifoEviction, LruEviction};
use response_cache::config::{Config, EvictionMode};
use response_cache::fetch::HttpFetcher;
use response_cache::spawn_sweep_task;
use response_cache::store::{CacheStore, DiskStore, MemoryStore};

/// Main entry point for the response cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the store, fetcher and cache manager
/// 4. Start background expiration sweep task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "response_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting response cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, sweep_interval={}s, cache_dir={:?}, eviction={:?}, coalesce={}",
        config.server_port,
        config.sweep_interval,
        config.cache_dir,
        config.eviction,
        config.coalesce_requests
    );

    let store: Arc<dyn CacheStore> = match &config.cache_dir {
        Some(dir) => {
            info!("Using disk store at {}", dir.display());
            Arc::new(DiskStore::new(dir))
        }
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let eviction: Arc<dyn EvictionPolicy> = match config.eviction {
        EvictionMode::Fifo => Arc::new(FifoEviction),
        EvictionMode::Lru => Arc::new(LruEviction::new()),
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout))
        .context("failed to create HTTP fetcher")?;

    let manager = CacheManager::new(store, Arc::new(fetcher))
        .with_eviction_policy(eviction)
        .with_coalescing(config.coalesce_requests);
    let registry = CacheRegistry::builtin();

    let sweep_handle = spawn_sweep_task(manager.clone(), registry.clone(), config.sweep_interval);
    info!("Background expiration sweep started");

    let app = create_router(AppState::new(manager, registry));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");
}
