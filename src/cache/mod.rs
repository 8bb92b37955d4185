//! Cache Module
//!
//! Versioned response caching with pluggable eviction, TTL sweeps and
//! three fetch strategies.

mod coalesce;
mod entry;
mod eviction;
mod expiration;
mod manager;
mod registry;
mod size;
mod stats;
mod strategy;


// Re-export public types
pub use coalesce::RequestCoalescer;
pub use entry::{EntryMetadata, HttpResponse, RequestKey, StoredEntry, DEFAULT_CHUNK_SIZE};
pub use eviction::{overflow, EvictionPolicy, FifoEviction, LruEviction};
pub use expiration::{Clock, ExpirationTracker, ManualClock, SystemClock};
pub use manager::CacheManager;
pub use registry::{store_name, CacheConfig, CacheRegistry};
pub use size::{stream_len, total_size, CategorySize};
pub use stats::CacheStats;
pub use strategy::CacheStrategy;
