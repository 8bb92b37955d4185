//! API Handlers
//!
//! HTTP request handlers for the proxy and cache administration endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use tracing::debug;

use crate::cache::{CacheConfig, CacheManager, CacheRegistry, HttpResponse};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearQuery, ClearResponse, ClearScope, FetchQuery, HealthResponse, SizesResponse,
    StatsResponse, SweepResponse,
};

/// Headers that describe the upstream connection rather than the payload.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: CacheManager,
    pub registry: Arc<CacheRegistry>,
}

impl AppState {
    pub fn new(manager: CacheManager, registry: CacheRegistry) -> Self {
        Self {
            manager,
            registry: Arc::new(registry),
        }
    }

    fn category(&self, key: &str) -> Result<&CacheConfig> {
        self.registry
            .get(key)
            .ok_or_else(|| CacheError::UnknownCategory(key.to_string()))
    }
}

/// Converts a cached or fetched response into an axum response.
fn into_http(response: HttpResponse) -> Result<Response> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| CacheError::Internal(format!("Invalid status {}", response.status)))?;

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in response.headers {
        if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.append(name, value);
        }
    }
    Ok(out)
}

/// Handler for GET /fetch
///
/// Runs the requested strategy and relays the response.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let config = state.category(&query.category)?;
    let strategy = query.strategy()?;
    let key = query.request_key();

    debug!("{} {} via {}", strategy, key, config.store_name());
    let response = state.manager.execute(strategy, &key, config).await?;
    into_http(response)
}

/// Handler for GET /caches
///
/// Reports the stored size of every registered category and their total.
pub async fn sizes_handler(State(state): State<AppState>) -> Result<Json<SizesResponse>> {
    let sizes = state.manager.category_sizes(&state.registry).await?;
    Ok(Json(SizesResponse::new(sizes)))
}

/// Handler for DELETE /caches/:category
pub async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ClearResponse>> {
    let config = state.category(&category)?;
    let cleared = if state.manager.clear_cache(config).await? {
        vec![config.store_name()]
    } else {
        Vec::new()
    };
    Ok(Json(ClearResponse::new(cleared)))
}

/// Handler for DELETE /caches
///
/// `scope=all` (default) removes every store, `scope=registered` only the
/// stores of registered categories.
pub async fn clear_all_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>> {
    let cleared = match query.scope {
        ClearScope::All => state.manager.clear_all_caches().await?,
        ClearScope::Registered => state.manager.clear_registered_caches(&state.registry).await?,
    };
    Ok(Json(ClearResponse::new(cleared)))
}

/// Handler for POST /caches/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let results = state.manager.sweep_registered(&state.registry).await;
    Json(SweepResponse::new(results))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.manager.stats();
    Json(StatsResponse::new(&stats, state.manager.eviction_policy()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
