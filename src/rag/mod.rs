//! Retrieval of knowledge-base passages for `/explain`.
//!
//! Documents under `rag.docs_dir` are chunked at startup ([`ingest`]) and
//! indexed in memory by a BM25 [`KeywordRetriever`]. The gateway only sees
//! the [`Retriever`] trait, so a missing or broken knowledge base simply means
//! no retriever and an empty context.

pub mod ingest;
pub mod keyword;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::error::Result;

pub use ingest::{load_documents, TextSplitter};
pub use keyword::KeywordRetriever;

/// A retrievable passage and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub source: String,
    pub content: String,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Returns the passages most relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// At most `k` documents, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>>;

    fn name(&self) -> &str;
}

/// Build the configured retriever.
///
/// Returns `None` when no docs directory is configured, when it does not
/// exist, or when it yields no usable chunks. Ingest failures are logged and
/// also yield `None`.
pub fn create_retriever(config: &RagConfig) -> Option<Arc<dyn Retriever>> {
    let Some(dir) = config.docs_dir.as_deref() else {
        info!("No docs directory configured; retrieval disabled");
        return None;
    };
    if !dir.is_dir() {
        warn!(path = %dir.display(), "Docs directory not found; retrieval disabled");
        return None;
    }

    let chunks = TextSplitter::new(config.chunk_size, config.chunk_overlap)
        .and_then(|splitter| {
            let docs = load_documents(dir)?;
            Ok(splitter.split_documents(&docs))
        });

    match chunks {
        Ok(chunks) if chunks.is_empty() => {
            warn!(path = %dir.display(), "No valid documents found; retrieval disabled");
            None
        }
        Ok(chunks) => {
            info!(path = %dir.display(), chunks = chunks.len(), "Knowledge base indexed");
            Some(Arc::new(KeywordRetriever::new(chunks)))
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Ingest failed; retrieval disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rag_config(dir: Option<std::path::PathBuf>) -> RagConfig {
        RagConfig {
            docs_dir: dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_docs_dir_disables_retrieval() {
        assert!(create_retriever(&rag_config(None)).is_none());
    }

    #[test]
    fn test_missing_docs_dir_disables_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(create_retriever(&rag_config(Some(missing))).is_none());
    }

    #[test]
    fn test_empty_docs_dir_disables_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blank.md"), "   \n").unwrap();
        assert!(create_retriever(&rag_config(Some(dir.path().to_path_buf()))).is_none());
    }

    #[tokio::test]
    async fn test_indexed_docs_are_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("python.md"),
            "Use list comprehensions instead of manual append loops.",
        )
        .unwrap();
        fs::write(
            dir.path().join("rust.md"),
            "Prefer iterators and the question mark operator for errors.",
        )
        .unwrap();

        let retriever = create_retriever(&rag_config(Some(dir.path().to_path_buf()))).unwrap();
        let docs = retriever.retrieve("append loops", 4).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].source.ends_with("python.md"));
    }
}
