//! Configuration for the code-explainer gateway.
//!
//! Loaded from a JSON file (`~/.code-explainer/config.json` unless a path is
//! given), then overridden by environment variables. A missing file means
//! defaults. Every section is `#[serde(default)]`, so partial files work.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{ExplainerError, Result};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// Model name sent to the provider and included in every cache key.
    pub model: String,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub rag: RagConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: DEFAULT_MODEL.to_string(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            rag: RagConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Upper bound on one generation, including the plain-text retry.
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::providers::groq::GROQ_API_BASE.to_string(),
            timeout_secs: 90,
            temperature: 0.1,
        }
    }
}

/// Capacity and lifetime of one response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheBounds {
    pub max_size: usize,
    pub ttl_secs: u64,
}

impl CacheBounds {
    pub const fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self { max_size, ttl_secs }
    }
}

impl Default for CacheBounds {
    fn default() -> Self {
        Self::new(128, 3600)
    }
}

/// Per-operation cache bounds. A partial section keeps that operation's
/// defaults for the fields it leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(deserialize_with = "explain_bounds")]
    pub explain: CacheBounds,
    #[serde(deserialize_with = "tests_bounds")]
    pub tests: CacheBounds,
    #[serde(deserialize_with = "refactor_bounds")]
    pub refactor: CacheBounds,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            explain: CacheBounds::new(256, 3600),
            tests: CacheBounds::new(128, 3600),
            refactor: CacheBounds::new(128, 3600),
        }
    }
}

#[derive(Deserialize)]
struct PartialBounds {
    max_size: Option<usize>,
    ttl_secs: Option<u64>,
}

impl PartialBounds {
    fn or(self, fallback: CacheBounds) -> CacheBounds {
        CacheBounds {
            max_size: self.max_size.unwrap_or(fallback.max_size),
            ttl_secs: self.ttl_secs.unwrap_or(fallback.ttl_secs),
        }
    }
}

fn explain_bounds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<CacheBounds, D::Error> {
    Ok(PartialBounds::deserialize(d)?.or(CacheConfig::default().explain))
}

fn tests_bounds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<CacheBounds, D::Error> {
    Ok(PartialBounds::deserialize(d)?.or(CacheConfig::default().tests))
}

fn refactor_bounds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<CacheBounds, D::Error> {
    Ok(PartialBounds::deserialize(d)?.or(CacheConfig::default().refactor))
}

/// Knowledge-base ingest settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Directory of text documents; `None` disables retrieval.
    pub docs_dir: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            docs_dir: None,
            chunk_size: 900,
            chunk_overlap: 150,
        }
    }
}

/// Input size limits, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest code the orchestrator will send to the model.
    pub max_code_chars: usize,
    /// Largest code the HTTP layer accepts at all.
    pub max_request_code_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_chars: 50_000,
            max_request_code_chars: 100_000,
        }
    }
}

impl Config {
    /// `~/.code-explainer`
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".code-explainer")
    }

    /// `~/.code-explainer/config.json`
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from `path` (or the default path), apply env overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Self::path();
        let path = path.unwrap_or(&default_path);
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. A missing file yields defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ExplainerError::Config(format!("failed to parse {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable lookup.
    ///
    /// `GROQ_API_KEY`, `MODEL`, `CODE_EXPLAINER_BIND`, `CODE_EXPLAINER_PORT`,
    /// `CODE_EXPLAINER_DOCS_DIR`. Blank values are ignored.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GROQ_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = get("MODEL") {
            self.model = model;
        }
        if let Some(bind) = get("CODE_EXPLAINER_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = get("CODE_EXPLAINER_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!(value = %port, error = %e, "Ignoring invalid CODE_EXPLAINER_PORT"),
            }
        }
        if let Some(dir) = get("CODE_EXPLAINER_DOCS_DIR") {
            self.rag.docs_dir = Some(PathBuf::from(dir));
        }
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, bounds) in [
            ("explain", self.cache.explain),
            ("tests", self.cache.tests),
            ("refactor", self.cache.refactor),
        ] {
            if bounds.max_size < 1 || bounds.ttl_secs < 1 {
                return Err(ExplainerError::InvalidConfiguration(format!(
                    "cache.{name}: max_size and ttl_secs must be at least 1"
                )));
            }
        }
        if self.limits.max_code_chars == 0
            || self.limits.max_code_chars > self.limits.max_request_code_chars
        {
            return Err(ExplainerError::InvalidConfiguration(
                "limits: need 0 < max_code_chars <= max_request_code_chars".into(),
            ));
        }
        if self.rag.chunk_size == 0 || self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ExplainerError::InvalidConfiguration(
                "rag: chunk_overlap must be smaller than a non-zero chunk_size".into(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ExplainerError::InvalidConfiguration(
                "provider.timeout_secs must be at least 1".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ExplainerError::InvalidConfiguration("model must not be empty".into()));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.provider
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
