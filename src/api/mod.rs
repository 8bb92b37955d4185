//! API Module
//!
//! HTTP handlers and routing for the caching proxy and its admin surface.
//!
//! # Endpoints
//! - `GET /fetch` - Fetch a URL through a cache strategy
//! - `GET /caches` - Per-category and total cache sizes
//! - `DELETE /caches` - Clear every cache (or only registered ones)
//! - `DELETE /caches/:category` - Clear one category
//! - `POST /caches/sweep` - Remove expired entries now
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
