//! OpenAI-compatible chat completions provider (Groq by default).
//!
//! Sends a system + user message pair to `{base_url}/chat/completions` and
//! returns the first choice's message content. JSON mode is requested with
//! `response_format: {"type": "json_object"}`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{ExplainerError, Result};

use super::{parse_provider_error, GenerationRequest, LLMProvider};

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Chat completions client for Groq and other OpenAI-compatible endpoints.
pub struct GroqProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqProvider {
    /// Build a client. A missing or blank key is allowed; calls then fail
    /// with a provider error instead of reaching the network.
    pub fn new(api_key: Option<&str>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplainerError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the `chat/completions` request body.
    pub fn build_request_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt }
            ],
            "temperature": request.temperature
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    /// Content of the first choice, if any.
    pub fn extract_text(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LLMProvider for GroqProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ExplainerError::Provider("GROQ_API_KEY is not set; add it to the environment or .env".into())
        })?;

        debug!(
            model = %request.model,
            json_mode = request.json_mode,
            "Chat completions request"
        );

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .json(&Self::build_request_body(request))
            .send()
            .await
            .map_err(|e| ExplainerError::Provider(format!("Groq request failed: {e}")))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                ExplainerError::Provider(format!("Failed to parse Groq response: {e}"))
            })?;
            return Ok(Self::extract_text(&json).unwrap_or_default());
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(parse_provider_error(status, &body_msg))
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}
