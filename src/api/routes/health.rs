//! Service index and health endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::server::AppState;

/// GET /: service name, version and endpoint map.
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "explain": "POST /explain",
            "generate_tests": "POST /generate-tests",
            "refactor": "POST /refactor",
            "cache_stats": "GET /cache/stats",
            "cache_clear": "POST /cache/clear",
            "debug_retrieval": "GET /debug-retrieval?query=...&k=4",
            "health": "GET /health",
        },
    }))
}

/// GET /health: "ok" with a provider key, "degraded" without one.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = if state.has_api_key { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.gateway.model(),
        "has_api_key": state.has_api_key,
        "retrieval": state.gateway.has_retriever(),
        "cache_sizes": state.gateway.caches().sizes(),
    }))
}
