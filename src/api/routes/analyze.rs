//! `POST /explain`, `POST /generate-tests`, `POST /refactor`.
//!
//! Bodies are decoded and checked here, then handed to the gateway. A body
//! that fails to decode or validate gets the operation's error shape, so every
//! answer is a 200 with `{..shape, cached, request_id}`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::middleware::RequestId;
use crate::api::server::AppState;
use crate::config::LimitsConfig;
use crate::error::{ExplainerError, Result};
use crate::gateway::{CodeRequest, ExplainOptions, Served, DEFAULT_K, K_RANGE};
use crate::normalize::{ExplainResponse, NormalizedResponse, RefactorResponse, TestResponse};
use crate::utils::sanitize::char_len;

/// Body of `POST /explain`.
#[derive(Debug, Deserialize)]
pub struct ExplainBody {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
    #[serde(default = "default_k")]
    pub k: usize,
}

/// Body of `POST /generate-tests` and `POST /refactor`.
#[derive(Debug, Deserialize)]
pub struct CodeBody {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_use_rag() -> bool {
    true
}

fn default_k() -> usize {
    DEFAULT_K
}

/// A response shape plus per-request metadata.
#[derive(Debug, Serialize)]
pub struct Envelope<R> {
    #[serde(flatten)]
    pub response: R,
    pub cached: bool,
    pub request_id: String,
}

impl ExplainBody {
    fn validate(self, limits: &LimitsConfig) -> Result<Self> {
        validate_code(&self.code, limits)?;
        if !K_RANGE.contains(&self.k) {
            return Err(ExplainerError::InputValidation(format!(
                "k must be between {} and {}",
                K_RANGE.start(),
                K_RANGE.end()
            )));
        }
        Ok(self)
    }
}

impl CodeBody {
    fn validate(self, limits: &LimitsConfig) -> Result<Self> {
        validate_code(&self.code, limits)?;
        Ok(self)
    }
}

fn validate_code(code: &str, limits: &LimitsConfig) -> Result<()> {
    let len = char_len(code);
    if len == 0 || len > limits.max_request_code_chars {
        return Err(ExplainerError::InputValidation(format!(
            "code must be between 1 and {} characters",
            limits.max_request_code_chars
        )));
    }
    if code.trim().is_empty() {
        return Err(ExplainerError::InputValidation(
            "code cannot be empty or whitespace only".into(),
        ));
    }
    Ok(())
}

fn decode<B>(body: std::result::Result<Json<B>, JsonRejection>) -> Result<B> {
    body.map(|Json(b)| b)
        .map_err(|rejection| ExplainerError::InputValidation(rejection.body_text()))
}

fn respond<R: NormalizedResponse>(served: Served<R>, request_id: String) -> Json<Envelope<R>> {
    info!(
        request_id = %request_id,
        operation = R::NAMESPACE,
        cached = served.from_cache,
        degraded = served.response.error().is_some(),
        "Request served"
    );
    Json(Envelope {
        response: served.response,
        cached: served.from_cache,
        request_id,
    })
}

fn reject<R: NormalizedResponse>(err: ExplainerError, request_id: String) -> Json<Envelope<R>> {
    warn!(request_id = %request_id, operation = R::NAMESPACE, error = %err, "Invalid request body");
    Json(Envelope {
        response: R::from_error(&err),
        cached: false,
        request_id,
    })
}

/// `POST /explain`
pub async fn explain(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: std::result::Result<Json<ExplainBody>, JsonRejection>,
) -> Json<Envelope<ExplainResponse>> {
    let body = match decode(body).and_then(|b| b.validate(&state.limits)) {
        Ok(body) => body,
        Err(err) => return reject(err, request_id),
    };
    let request = CodeRequest::new(body.code, body.language.as_deref());
    let options = ExplainOptions {
        use_rag: body.use_rag,
        k: body.k,
    };
    let served = state.gateway.explain(&request, options).await;
    respond(served, request_id)
}

/// `POST /generate-tests`
pub async fn generate_tests(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: std::result::Result<Json<CodeBody>, JsonRejection>,
) -> Json<Envelope<TestResponse>> {
    let body = match decode(body).and_then(|b| b.validate(&state.limits)) {
        Ok(body) => body,
        Err(err) => return reject(err, request_id),
    };
    let request = CodeRequest::new(body.code, body.language.as_deref());
    let served = state.gateway.generate_tests(&request).await;
    respond(served, request_id)
}

/// `POST /refactor`
pub async fn refactor(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: std::result::Result<Json<CodeBody>, JsonRejection>,
) -> Json<Envelope<RefactorResponse>> {
    let body = match decode(body).and_then(|b| b.validate(&state.limits)) {
        Ok(body) => body,
        Err(err) => return reject(err, request_id),
    };
    let request = CodeRequest::new(body.code, body.language.as_deref());
    let served = state.gateway.refactor(&request).await;
    respond(served, request_id)
}
