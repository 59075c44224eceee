//! Document loading and recursive character splitting.

use std::collections::VecDeque;
use std::path::Path;

use tracing::debug;

use super::Document;
use crate::error::{ExplainerError, Result};
use crate::utils::sanitize::char_len;

/// Separator ladder: paragraph, line, word, character.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Read every UTF-8 text file under `dir`, recursively.
///
/// Files that are not valid UTF-8 are skipped. Blank documents are dropped.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    // The directory is literal; only the suffix is a pattern.
    let pattern = format!("{}/**/*.*", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern)
        .map_err(|e| ExplainerError::Retrieval(format!("invalid docs pattern {pattern}: {e}")))?;

    let mut docs = Vec::new();
    for path in paths.filter_map(|entry| entry.ok()).filter(|p| p.is_file()) {
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => {
                docs.push(Document::new(path.display().to_string(), content));
            }
            Ok(_) => debug!(path = %path.display(), "Skipping blank document"),
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable document"),
        }
    }
    Ok(docs)
}

/// Splits text into overlapping chunks, preferring paragraph, then line,
/// then word boundaries. Sizes are in characters.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ExplainerError::InvalidConfiguration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split every document; each chunk keeps its document's source.
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Document> {
        docs.iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(move |chunk| Document::new(doc.source.clone(), chunk))
            })
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let idx = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(idx).copied().unwrap_or("");
        let finer = separators.get(idx + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut small: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small, separator));
                small.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(&small, separator));
        }
        chunks
    }

    /// Greedily pack pieces up to `chunk_size`, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);
                while total > self.chunk_overlap
                    || (total > 0 && total + len + sep_len > self.chunk_size)
                {
                    let Some((_, front_len)) = window.pop_front() else {
                        break;
                    };
                    total -= front_len + if window.is_empty() { 0 } else { sep_len };
                }
            }
            let joiner = if window.is_empty() { 0 } else { sep_len };
            total += len + joiner;
            window.push_back((piece.as_str(), len));
        }
        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
