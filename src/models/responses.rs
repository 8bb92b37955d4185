//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{total_size, CacheStats, CategorySize};

/// Response body for GET /caches
#[derive(Debug, Clone, Serialize)]
pub struct SizesResponse {
    pub categories: Vec<CategorySize>,
    /// Sum of every category's size
    pub total_bytes: u64,
}

impl SizesResponse {
    pub fn new(categories: Vec<CategorySize>) -> Self {
        let total_bytes = total_size(&categories);
        Self {
            categories,
            total_bytes,
        }
    }
}

/// Response body for the clear endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Store names that were deleted
    pub cleared: Vec<String>,
}

impl ClearResponse {
    pub fn new(cleared: Vec<String>) -> Self {
        Self {
            message: format!("Cleared {} cache(s)", cleared.len()),
            cleared,
        }
    }
}

/// Per-category result of a sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub category: String,
    pub removed: usize,
}

/// Response body for POST /caches/sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub categories: Vec<SweepResult>,
    pub total_removed: usize,
}

impl SweepResponse {
    pub fn new(results: Vec<(String, usize)>) -> Self {
        let categories: Vec<SweepResult> = results
            .into_iter()
            .map(|(category, removed)| SweepResult { category, removed })
            .collect();
        let total_removed = categories.iter().map(|c| c.removed).sum();
        Self {
            categories,
            total_removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
    pub evictions: u64,
    pub expired: u64,
    pub write_failures: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Active eviction policy
    pub eviction_policy: String,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, eviction_policy: impl Into<String>) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            network_fetches: stats.network_fetches,
            evictions: stats.evictions,
            expired: stats.expired,
            write_failures: stats.write_failures,
            hit_rate: stats.hit_rate(),
            eviction_policy: eviction_policy.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(category: &str, bytes: u64) -> CategorySize {
        CategorySize {
            category: category.to_string(),
            store_name: format!("{}-v1", category),
            size_bytes: bytes,
            entries: 1,
        }
    }

    #[test]
    fn test_sizes_total() {
        let resp = SizesResponse::new(vec![size("images", 100), size("api", 250)]);
        assert_eq!(resp.total_bytes, 350);
    }

    #[test]
    fn test_clear_response_message() {
        let resp = ClearResponse::new(vec!["a-v1".to_string(), "b-v1".to_string()]);
        assert_eq!(resp.message, "Cleared 2 cache(s)");
    }

    #[test]
    fn test_sweep_response_total() {
        let resp = SweepResponse::new(vec![("api".to_string(), 3), ("images".to_string(), 1)]);
        assert_eq!(resp.total_removed, 4);
        assert_eq!(resp.categories[0].category, "api");
    }

    #[test]
    fn test_stats_response_serialize() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        let json = serde_json::to_string(&StatsResponse::new(&stats, "fifo")).unwrap();
        assert!(json.contains("\"hit_rate\":0.5"));
        assert!(json.contains("\"eviction_policy\":\"fifo\""));
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
