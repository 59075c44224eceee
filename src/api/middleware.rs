//! Request-id propagation and panic containment.
//!
//! Every request gets an id: the inbound `X-Request-ID` header when present,
//! otherwise a fresh UUID v4. Handlers read it through the [`RequestId`]
//! extension and the response always echoes it in the same header.
//!
//! A panic anywhere below this layer is turned into a 200 JSON body
//! `{error, detail, request_id, type}` instead of a dropped connection.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use serde_json::json;
use tracing::{debug, error};

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound id accepted verbatim.
const MAX_REQUEST_ID_LEN: usize = 128;

/// The id of the current request, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Assign a request id, echo it on the response, and convert panics into JSON.
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    debug!(request_id = %request_id, method = %request.method(), path = %request.uri().path(), "Request received");
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!(request_id = %request_id, detail = %detail, "Handler panicked");
            Json(json!({
                "error": "An unexpected error occurred",
                "detail": detail,
                "request_id": request_id,
                "type": "panic",
            }))
            .into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware as axum_mw, routing::get, Extension, Router};
    use tower::util::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    fn make_app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(RequestId(id)): Extension<RequestId>| async move { id }),
            )
            .route("/boom", get(boom))
            .layer(axum_mw::from_fn(request_id_middleware))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_propagated() {
        let req = Request::builder()
            .uri("/echo")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        let resp = make_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], "abc-123");
        assert_eq!(body_string(resp).await, "abc-123");
    }

    #[tokio::test]
    async fn test_missing_request_id_is_generated() {
        let req = Request::builder().uri("/echo").body(Body::empty()).unwrap();
        let resp = make_app().oneshot(req).await.unwrap();
        let header = resp.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&header).is_ok());
        assert_eq!(body_string(resp).await, header);
    }

    #[tokio::test]
    async fn test_oversized_request_id_is_replaced() {
        let req = Request::builder()
            .uri("/echo")
            .header(REQUEST_ID_HEADER, "x".repeat(500))
            .body(Body::empty())
            .unwrap();
        let resp = make_app().oneshot(req).await.unwrap();
        let header = resp.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(header).is_ok());
    }

    #[tokio::test]
    async fn test_panic_becomes_json_200() {
        let req = Request::builder()
            .uri("/boom")
            .header(REQUEST_ID_HEADER, "req-9")
            .body(Body::empty())
            .unwrap();
        let resp = make_app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[REQUEST_ID_HEADER], "req-9");
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"], "An unexpected error occurred");
        assert_eq!(body["detail"], "handler exploded");
        assert_eq!(body["request_id"], "req-9");
        assert_eq!(body["type"], "panic");
    }
}
