//! Request and result types of the orchestrator.

use serde::Serialize;

/// Language assumed when a request names none.
pub const DEFAULT_LANGUAGE: &str = "python";
/// Retrieved passages per explain request unless asked otherwise.
pub const DEFAULT_K: usize = 4;
/// Accepted range for `k`.
pub const K_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Code submitted to any of the three operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRequest {
    pub code: String,
    /// Lowercased; defaults to [`DEFAULT_LANGUAGE`].
    pub language: String,
}

impl CodeRequest {
    pub fn new(code: impl Into<String>, language: Option<&str>) -> Self {
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_lowercase();
        Self {
            code: code.into(),
            language,
        }
    }
}

/// Retrieval options for `/explain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplainOptions {
    pub use_rag: bool,
    pub k: usize,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self {
            use_rag: true,
            k: DEFAULT_K,
        }
    }
}

/// A response and whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<R> {
    pub response: R,
    pub from_cache: bool,
}

impl<R> Served<R> {
    pub(crate) fn fresh(response: R) -> Self {
        Self {
            response,
            from_cache: false,
        }
    }

    pub(crate) fn cached(response: R) -> Self {
        Self {
            response,
            from_cache: true,
        }
    }
}

/// One `/debug-retrieval` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalPreview {
    pub source: String,
    pub preview: String,
}

/// Cache-relevant fields of an explain request.
#[derive(Serialize)]
pub(crate) struct ExplainKey<'a> {
    pub code: &'a str,
    pub language: &'a str,
    pub use_rag: bool,
    pub k: usize,
    pub model: &'a str,
}

/// Cache-relevant fields of a tests or refactor request.
#[derive(Serialize)]
pub(crate) struct CodeKey<'a> {
    pub code: &'a str,
    pub language: &'a str,
    pub model: &'a str,
}
