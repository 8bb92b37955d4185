//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which eviction policy the cache manager uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionMode {
    /// Insertion order
    #[default]
    Fifo,
    /// Least recently used
    Lru,
}

impl FromStr for EvictionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(EvictionMode::Fifo),
            "lru" => Ok(EvictionMode::Lru),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between expiration sweeps
    pub sweep_interval: u64,
    /// Root directory for the disk store; `None` keeps everything in memory
    pub cache_dir: Option<PathBuf>,
    /// Eviction policy for every category
    pub eviction: EvictionMode,
    /// Share one fetch between concurrent identical requests
    pub coalesce_requests: bool,
    /// Network fetch timeout in seconds
    pub fetch_timeout: u64,
}

/// Reads and parses an env var, falling back when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiration sweep frequency in seconds (default: 60)
    /// - `CACHE_DIR` - Disk store root (default: unset, in-memory store)
    /// - `EVICTION_POLICY` - `fifo` or `lru` (default: fifo)
    /// - `COALESCE_REQUESTS` - `true` or `false` (default: false)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            eviction: env_or("EVICTION_POLICY", defaults.eviction),
            coalesce_requests: env_or("COALESCE_REQUESTS", defaults.coalesce_requests),
            fetch_timeout: env_or("FETCH_TIMEOUT", defaults.fetch_timeout),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            sweep_interval: 60,
            cache_dir: None,
            eviction: EvictionMode::Fifo,
            coalesce_requests: false,
            fetch_timeout: 30,
        }
    }
}
