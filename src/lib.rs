//! Code Explainer - a caching LLM gateway for source code.
//!
//! Three operations (explain, generate tests, refactor) share one pipeline:
//! input screening, a per-operation LRU+TTL response cache, generation through
//! an [`providers::LLMProvider`], and normalization of whatever the model
//! returns into a fixed response shape. Explanations can be grounded in a
//! local knowledge base through a [`rag::Retriever`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod rag;
pub mod security;
pub mod utils;

pub use config::Config;
pub use error::{ExplainerError, Result};
pub use gateway::{CodeRequest, ExplainOptions, Gateway, Served};
