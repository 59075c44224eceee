//! Cache inspection and reset.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::api::server::AppState;
use crate::cache::CacheSetStats;

/// GET /cache/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<CacheSetStats> {
    Json(state.gateway.caches().stats())
}

/// POST /cache/clear: empties every cache and resets its counters.
pub async fn clear(State(state): State<Arc<AppState>>) -> Json<Value> {
    let caches = state.gateway.caches();
    caches.clear_all();
    info!("All caches cleared");
    Json(json!({
        "status": "all caches cleared",
        "cache_sizes": caches.sizes(),
    }))
}
