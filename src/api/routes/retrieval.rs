//! Knowledge-base debug view.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::server::AppState;
use crate::gateway::{DEFAULT_K, K_RANGE};

#[derive(Debug, Deserialize)]
pub struct RetrievalParams {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    DEFAULT_K
}

/// GET /debug-retrieval?query=..&k=4
///
/// `{query, results: [{source, preview}]}`; on any failure `results` is empty
/// and `error` says why.
pub async fn debug_retrieval(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RetrievalParams>, QueryRejection>,
) -> Json<Value> {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return failure("", rejection.body_text()),
    };
    if !K_RANGE.contains(&params.k) {
        let message = format!("k must be between {} and {}", K_RANGE.start(), K_RANGE.end());
        return failure(&params.query, message);
    }

    match state.gateway.debug_retrieval(&params.query, params.k).await {
        Ok(results) => Json(json!({
            "query": params.query,
            "results": results,
        })),
        Err(e) => {
            warn!(error = %e, "Retrieval debug failed");
            failure(&params.query, e.to_string())
        }
    }
}

fn failure(query: &str, error: String) -> Json<Value> {
    Json(json!({
        "query": query,
        "results": [],
        "error": error,
    }))
}
