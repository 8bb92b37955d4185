//! Response Cache - versioned HTTP response caching
//!
//! Serves responses through cache-first, network-first or
//! stale-while-revalidate strategies, with per-category TTL sweeps and
//! capacity-bound eviction.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheConfig, CacheManager, CacheRegistry, CacheStrategy, HttpResponse, RequestKey};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
