//! Fetch Module
//!
//! The network-fetch primitive the cache sits in front of.

mod http;

use async_trait::async_trait;

use crate::cache::{HttpResponse, RequestKey};
use crate::error::Result;

pub use http::HttpFetcher;

// == Fetcher Trait ==
/// Performs a network request.
///
/// Fails with [`CacheError::Network`](crate::error::CacheError::Network)
/// only for network-level errors. A non-2xx status is a normal return.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &RequestKey) -> Result<HttpResponse>;
}
