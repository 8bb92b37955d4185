//! Cache Strategies
//!
//! Named orderings of cache lookup versus network fetch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    /// Serve from cache; fetch only on a miss
    CacheFirst,
    /// Fetch; fall back to cache on network failure
    #[default]
    NetworkFirst,
    /// Serve from cache immediately and refresh in the background
    StaleWhileRevalidate,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::CacheFirst => "cache-first",
            CacheStrategy::NetworkFirst => "network-first",
            CacheStrategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cache-first" => Ok(CacheStrategy::CacheFirst),
            "network-first" => Ok(CacheStrategy::NetworkFirst),
            "stale-while-revalidate" | "swr" => Ok(CacheStrategy::StaleWhileRevalidate),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown cache strategy: {}",
                other
            ))),
        }
    }
}
