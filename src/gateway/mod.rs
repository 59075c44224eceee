//! Request orchestration: validation, screening, cache, generation.
//!
//! Each operation runs the same pipeline:
//!
//! 1. Reject empty or oversized code.
//! 2. Reject code the injection detector flags. Rejections never touch the cache.
//! 3. Build the cache key from the cache-relevant fields and look it up.
//! 4. On a miss, generate (explain retrieves context first) under a timeout.
//! 5. Normalize the model output into the operation's fixed shape.
//! 6. Store the response only if it is a clean success (`error == null`).
//!
//! Every failure becomes the operation's error shape here; callers always get
//! a response. Cache locks are only held inside synchronous cache calls, never
//! across the generation await.

mod types;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{build_key, short_key, CacheSet, ResponseCache};
use crate::config::{Config, LimitsConfig};
use crate::error::{ExplainerError, Result};
use crate::normalize::{Citation, ExplainResponse, NormalizedResponse, RefactorResponse, TestResponse};
use crate::prompts;
use crate::providers::{generate_with_fallback, GenerationRequest, LLMProvider};
use crate::rag::{Document, Retriever};
use crate::security::detect_prompt_injection;
use crate::utils::sanitize::{char_len, take_chars};

pub use types::{
    CodeRequest, ExplainOptions, RetrievalPreview, Served, DEFAULT_K, DEFAULT_LANGUAGE, K_RANGE,
};
use types::{CodeKey, ExplainKey};

/// Characters of code used as the retrieval query.
const RETRIEVAL_QUERY_CHARS: usize = 2_000;
/// Characters of a retrieved passage kept as a citation snippet.
const CITATION_SNIPPET_CHARS: usize = 300;
/// Characters of a retrieved passage shown by the retrieval debug view.
const DEBUG_PREVIEW_CHARS: usize = 350;

/// Generation settings shared by all operations.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub limits: LimitsConfig,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.provider.temperature,
            timeout: Duration::from_secs(config.provider.timeout_secs),
            limits: config.limits,
        }
    }
}

/// Entry point for explain, generate-tests and refactor.
pub struct Gateway {
    caches: CacheSet,
    provider: Arc<dyn LLMProvider>,
    retriever: Option<Arc<dyn Retriever>>,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(
        caches: CacheSet,
        provider: Arc<dyn LLMProvider>,
        retriever: Option<Arc<dyn Retriever>>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            caches,
            provider,
            retriever,
            settings,
        }
    }

    /// Build the caches from `config` and wire in the collaborators.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn LLMProvider>,
        retriever: Option<Arc<dyn Retriever>>,
    ) -> Result<Self> {
        Ok(Self::new(
            CacheSet::from_config(&config.cache)?,
            provider,
            retriever,
            GatewaySettings::from_config(config),
        ))
    }

    pub fn caches(&self) -> &CacheSet {
        &self.caches
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Explain code, optionally grounded in knowledge-base passages.
    pub async fn explain(
        &self,
        request: &CodeRequest,
        options: ExplainOptions,
    ) -> Served<ExplainResponse> {
        let key = ExplainKey {
            code: request.code.trim(),
            language: &request.language,
            use_rag: options.use_rag,
            k: options.k,
            model: &self.settings.model,
        };
        self.run(&self.caches.explain, request, "explain", &key, move || {
            self.generate_explanation(request, options)
        })
        .await
    }

    /// Generate unit tests for code.
    pub async fn generate_tests(&self, request: &CodeRequest) -> Served<TestResponse> {
        let key = CodeKey {
            code: request.code.trim(),
            language: &request.language,
            model: &self.settings.model,
        };
        self.run(&self.caches.tests, request, "generate tests", &key, move || async move {
            let raw = self
                .complete(
                    prompts::tests_system_prompt(),
                    prompts::tests_prompt(&request.language, &request.code),
                )
                .await?;
            TestResponse::normalize(&raw)
        })
        .await
    }

    /// Refactor code.
    pub async fn refactor(&self, request: &CodeRequest) -> Served<RefactorResponse> {
        let key = CodeKey {
            code: request.code.trim(),
            language: &request.language,
            model: &self.settings.model,
        };
        self.run(&self.caches.refactor, request, "refactor", &key, move || async move {
            let raw = self
                .complete(
                    prompts::refactor_system_prompt(),
                    prompts::refactor_prompt(&request.language, &request.code),
                )
                .await?;
            RefactorResponse::normalize(&raw)
        })
        .await
    }

    /// Raw retrieval results for inspecting the knowledge base.
    pub async fn debug_retrieval(&self, query: &str, k: usize) -> Result<Vec<RetrievalPreview>> {
        let retriever = self
            .retriever
            .as_ref()
            .ok_or_else(|| ExplainerError::Retrieval("knowledge base is not configured".into()))?;
        let docs = retriever.retrieve(query, k).await?;
        Ok(docs
            .into_iter()
            .map(|doc| RetrievalPreview {
                preview: take_chars(&doc.content, DEBUG_PREVIEW_CHARS).to_string(),
                source: doc.source,
            })
            .collect())
    }

    // -- pipeline ----------------------------------------------------------

    async fn run<R, K, F, Fut>(
        &self,
        cache: &ResponseCache<R>,
        request: &CodeRequest,
        action: &str,
        key_payload: &K,
        generate: F,
    ) -> Served<R>
    where
        R: NormalizedResponse,
        K: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let operation = R::NAMESPACE;

        if let Err(err) = self.screen(&request.code, action) {
            info!(operation, kind = err.kind(), error = %err, "Request rejected");
            return Served::fresh(R::from_error(&err));
        }

        let key = match build_key(operation, key_payload) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(operation, error = %err, "Serving uncached");
                None
            }
        };

        if let Some(key) = key.as_deref() {
            if let Some(hit) = cache.get(key) {
                info!(operation, key = %short_key(key), "Cache hit");
                return Served::cached(hit);
            }
            debug!(operation, key = %short_key(key), "Cache miss");
        }

        let response = match tokio::time::timeout(self.settings.timeout, generate()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(operation, kind = err.kind(), error = %err, "Generation degraded");
                R::from_error(&err)
            }
            Err(_) => {
                let err = ExplainerError::GenerationFailed(format!(
                    "model did not respond within {:?}",
                    self.settings.timeout
                ));
                warn!(operation, error = %err, "Generation timed out");
                R::from_error(&err)
            }
        };

        match (response.error(), key) {
            (None, Some(key)) => {
                info!(operation, key = %short_key(&key), "Cache set");
                cache.set(key, response.clone());
            }
            (Some(reason), _) => debug!(operation, reason, "Degraded response not cached"),
            (None, None) => {}
        }

        Served::fresh(response)
    }

    /// Input validation followed by injection screening.
    fn screen(&self, code: &str, action: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(ExplainerError::InputValidation(format!(
                "No code provided to {action}."
            )));
        }
        let max = self.settings.limits.max_code_chars;
        if char_len(code) > max {
            return Err(ExplainerError::InputValidation(format!(
                "Code is too long. Please submit code under {} characters.",
                group_thousands(max)
            )));
        }
        let detection = detect_prompt_injection(code);
        if detection.suspicious {
            return Err(ExplainerError::SafetyRejection {
                reason: detection.reason,
            });
        }
        Ok(())
    }

    async fn generate_explanation(
        &self,
        request: &CodeRequest,
        options: ExplainOptions,
    ) -> Result<ExplainResponse> {
        let (context, citations) = self.retrieve_context(&request.code, options).await;
        let raw = self
            .complete(
                prompts::explain_system_prompt(),
                prompts::explain_prompt(&request.language, &request.code, &context),
            )
            .await?;

        // Malformed output still reports what was retrieved.
        match ExplainResponse::normalize(&raw) {
            Ok(response) => Ok(response.with_fallback_citations(citations)),
            Err(err) => {
                warn!(operation = "explain", kind = err.kind(), error = %err, "Model output rejected");
                Ok(ExplainResponse::from_error(&err).with_fallback_citations(citations))
            }
        }
    }

    /// Context block and citations for an explain prompt. Never fails.
    async fn retrieve_context(&self, code: &str, options: ExplainOptions) -> (String, Vec<Citation>) {
        let docs = match (&self.retriever, options.use_rag) {
            (Some(retriever), true) => {
                let query = take_chars(code, RETRIEVAL_QUERY_CHARS);
                match retriever.retrieve(query, options.k).await {
                    Ok(docs) => docs,
                    Err(e) => {
                        warn!(retriever = retriever.name(), error = %e, "Retrieval failed, continuing without context");
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };
        build_context(&docs)
    }

    async fn complete(&self, system_prompt: String, user_prompt: String) -> Result<String> {
        let request = GenerationRequest {
            model: self.settings.model.clone(),
            system_prompt,
            user_prompt,
            json_mode: true,
            temperature: self.settings.temperature,
        };
        generate_with_fallback(self.provider.as_ref(), request).await
    }
}

fn build_context(docs: &[Document]) -> (String, Vec<Citation>) {
    let context = docs
        .iter()
        .map(|d| format!("[SOURCE: {}]\n{}", d.source, d.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    let context = match context.trim() {
        "" => prompts::EMPTY_CONTEXT.to_string(),
        trimmed => trimmed.to_string(),
    };
    let citations = docs
        .iter()
        .map(|d| Citation {
            source: d.source.clone(),
            snippet: take_chars(&d.content, CITATION_SNIPPET_CHARS).to_string(),
        })
        .collect();
    (context, citations)
}

/// `50000` -> `"50,000"`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
