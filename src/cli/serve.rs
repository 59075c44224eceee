//! `code-explainer serve`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use code_explainer::api::{start_server, AppState};
use code_explainer::config::Config;
use code_explainer::gateway::Gateway;
use code_explainer::providers::groq::GroqProvider;
use code_explainer::providers::LLMProvider;
use code_explainer::rag::create_retriever;

/// Build the gateway from `config` and serve until Ctrl-C.
pub async fn cmd_serve(config: Config) -> Result<()> {
    let gateway = build_gateway(&config)?;
    let has_api_key = config.has_api_key();
    if !has_api_key {
        warn!("GROQ_API_KEY is not set; generation requests will return errors");
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.model,
        retrieval = gateway.has_retriever(),
        "code-explainer starting"
    );

    let state = AppState::new(Arc::new(gateway), has_api_key, config.limits);
    start_server(&config.server, state)
        .await
        .context("API server failed")
}

/// Provider, retriever and caches wired from configuration.
pub fn build_gateway(config: &Config) -> Result<Gateway> {
    let provider: Arc<dyn LLMProvider> = Arc::new(
        GroqProvider::new(
            config.provider.api_key.as_deref(),
            &config.provider.base_url,
            Duration::from_secs(config.provider.timeout_secs),
        )
        .context("failed to build completion provider")?,
    );
    let retriever = create_retriever(&config.rag);
    Gateway::from_config(config, provider, retriever).context("failed to build gateway")
}
