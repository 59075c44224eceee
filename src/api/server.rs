//! Axum API server for the code-explainer gateway.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use super::routes;
use crate::config::{LimitsConfig, ServerConfig};
use crate::error::Result;
use crate::gateway::Gateway;

/// Widest JSON encoding of one char: a `\uXXXX\uXXXX` surrogate pair.
const MAX_ESCAPED_CHAR_BYTES: usize = 12;
/// Room for the other body fields and whitespace.
const BODY_SLACK_BYTES: usize = 64 * 1024;

/// Largest request body that can still carry `max_request_code_chars` of code,
/// however the client escapes it.
pub fn max_body_bytes(limits: &LimitsConfig) -> usize {
    limits
        .max_request_code_chars
        .saturating_mul(MAX_ESCAPED_CHAR_BYTES)
        .saturating_add(BODY_SLACK_BYTES)
}

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Whether a provider key was configured at startup; reported by `/health`.
    pub has_api_key: bool,
    /// Boundary limits applied to request bodies before they reach the gateway.
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, has_api_key: bool, limits: LimitsConfig) -> Self {
        Self {
            gateway,
            has_api_key,
            limits,
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let body_limit = max_body_bytes(&state.limits);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health))
        .route("/explain", post(routes::analyze::explain))
        .route("/generate-tests", post(routes::analyze::generate_tests))
        .route("/refactor", post(routes::analyze::refactor))
        .route("/cache/stats", get(routes::cache::stats))
        .route("/cache/clear", post(routes::cache::clear))
        .route("/debug-retrieval", get(routes::retrieval::debug_retrieval))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        // Outermost, so panics in any layer below still get a JSON body.
        .layer(axum_mw::from_fn(request_id_middleware))
        .with_state(shared_state)
}

/// Any origin when `origins` is empty or contains `*`, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([HeaderName::from_static("content-type"), request_id.clone()])
        .expose_headers([request_id]);

    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = build_router(state, &config.cors_origins);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{state_with, StubProvider, UNIVERSAL_REPLY};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app(provider: Arc<StubProvider>) -> Router {
        build_router(state_with(provider, true), &[])
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_explain_end_to_end_with_cache() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        let app = app(provider.clone());
        let body = serde_json::json!({"code": "def add(a, b):\n    return a + b", "language": "Python"});

        let (status, first) = send(app.clone(), post_json("/explain", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["overview"], "Adds two numbers.");
        assert_eq!(first["cached"], false);
        assert!(first["error"].is_null());
        assert!(!first["request_id"].as_str().unwrap().is_empty());

        let (_, second) = send(app.clone(), post_json("/explain", body)).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["overview"], "Adds two numbers.");
        assert_eq!(provider.calls(), 1);

        let (_, stats) = send(
            app,
            Request::builder().uri("/cache/stats").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(stats["explain"]["hits"], 1);
        assert_eq!(stats["explain"]["misses"], 1);
        assert_eq!(stats["explain"]["current_size"], 1);
        assert_eq!(stats["test"]["total_requests"], 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error_shape() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/refactor")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(provider.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].is_string());
        assert_eq!(body["refactored_code"], "");
        assert_eq!(body["cached"], false);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        let mut req = post_json("/generate-tests", serde_json::json!({"code": "x = 1"}));
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_static("trace-42"));
        let resp = app(provider).oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], "trace-42");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["request_id"], "trace-42");
        assert_eq!(body["test_file_name"], "test_add.py");
    }

    #[tokio::test]
    async fn test_clear_then_health() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        let app = app(provider);
        send(
            app.clone(),
            post_json("/refactor", serde_json::json!({"code": "x=1"})),
        )
        .await;

        let (_, health) = send(
            app.clone(),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(health["cache_sizes"]["refactor"], 1);

        let (_, cleared) = send(
            app.clone(),
            Request::builder()
                .method(Method::POST)
                .uri("/cache/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(cleared["status"], "all caches cleared");
        assert_eq!(cleared["cache_sizes"]["refactor"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        let resp = app(provider)
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_body_limit_follows_code_limit() {
        let limits = LimitsConfig::default();
        assert!(max_body_bytes(&limits) >= limits.max_request_code_chars * 12);
    }

    #[tokio::test]
    async fn test_ascii_escaped_body_near_limit_reaches_validation() {
        let provider = Arc::new(StubProvider::new(UNIVERSAL_REPLY));
        // 99,000 chars, each sent as a 12-byte surrogate pair escape.
        let body = format!(r#"{{"code": "{}"}}"#, "\\ud83d\\ude00".repeat(99_000));
        assert!(body.len() > 1024 * 1024);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/generate-tests")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(app(provider.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        let error = body["error"].as_str().unwrap();
        assert!(!error.contains("length limit"), "{error}");
        assert!(error.contains("Code is too long"), "{error}");
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        let _ = cors_layer(&["http://localhost:3000".into(), "bad\norigin".into()]);
        let _ = cors_layer(&[]);
    }
}
