//! HTTP Fetcher
//!
//! reqwest-backed implementation of the fetch primitive.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::cache::{HttpResponse, RequestKey};
use crate::error::{CacheError, Result};
use crate::fetch::Fetcher;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestKey) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            CacheError::InvalidRequest(format!("Invalid HTTP method: {}", request.method))
        })?;

        debug!("Fetching {}", request);
        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(|e| CacheError::Network(format!("{}: {}", request, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Network(format!("{}: {}", request, e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
