//! Completion providers.
//!
//! The gateway talks to the model through [`LLMProvider`]. The only shipped
//! implementation is [`groq::GroqProvider`], an OpenAI-compatible chat
//! completions client.

pub mod groq;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ExplainerError, Result};

pub use groq::GroqProvider;

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Ask the provider for a structured JSON object response.
    pub json_mode: bool,
    pub temperature: f32,
}

/// A hosted model that turns a prompt into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Return the raw completion text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Generate with structured JSON mode, retrying once as plain text.
///
/// Any failure of the JSON-mode call triggers the retry. A failed retry or an
/// empty completion is [`ExplainerError::GenerationFailed`].
pub async fn generate_with_fallback(
    provider: &dyn LLMProvider,
    mut request: GenerationRequest,
) -> Result<String> {
    request.json_mode = true;
    let content = match provider.generate(&request).await {
        Ok(content) => content,
        Err(err) => {
            warn!(error = %err, "JSON mode generation failed, retrying without response_format");
            request.json_mode = false;
            provider
                .generate(&request)
                .await
                .map_err(|e| ExplainerError::GenerationFailed(e.to_string()))?
        }
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(ExplainerError::GenerationFailed(
            "provider returned an empty completion".into(),
        ));
    }
    debug!(chars = content.len(), json_mode = request.json_mode, "Completion received");
    Ok(content.to_string())
}

/// Map a non-success HTTP status and body message to a provider error.
pub fn parse_provider_error(status: u16, message: &str) -> ExplainerError {
    let kind = match status {
        400 => "bad request",
        401 | 403 => "authentication failed",
        404 => "model or endpoint not found",
        408 => "request timed out",
        413 => "prompt too large",
        429 => "rate limited",
        500..=599 => "upstream server error",
        _ => "unexpected status",
    };
    ExplainerError::Provider(format!("{kind} ({status}): {message}"))
}
