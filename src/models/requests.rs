//! Request DTOs for the cache API
//!
//! Defines the query parameters accepted by the HTTP endpoints.

use serde::Deserialize;

use crate::cache::{CacheStrategy, RequestKey};

/// Query for the proxy endpoint (GET /fetch)
#[derive(Debug, Clone, Deserialize)]
pub struct FetchQuery {
    /// Upstream URL
    pub url: String,
    /// HTTP method, GET if omitted
    #[serde(default)]
    pub method: Option<String>,
    /// Cache category key
    pub category: String,
    /// Strategy, network-first if omitted
    #[serde(default)]
    pub strategy: Option<String>,
}

impl FetchQuery {
    /// Validates the query data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.url.trim().is_empty() {
            return Some("URL cannot be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Some("Category cannot be empty".to_string());
        }
        None
    }

    pub fn request_key(&self) -> RequestKey {
        RequestKey::new(self.method.as_deref().unwrap_or("GET"), self.url.clone())
    }

    pub fn strategy(&self) -> Result<CacheStrategy, crate::error::CacheError> {
        match &self.strategy {
            Some(s) => s.parse(),
            None => Ok(CacheStrategy::default()),
        }
    }
}

/// Which stores DELETE /caches removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    /// Every store the backend holds
    #[default]
    All,
    /// Only stores of registered categories
    Registered,
}

/// Query for DELETE /caches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub scope: ClearScope,
}
