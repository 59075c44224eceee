//! In-memory BM25 keyword retriever.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{Document, Retriever};
use crate::error::Result;

/// Term-frequency saturation.
const K1: f64 = 1.2;
/// Length normalization.
const B: f64 = 0.75;

/// BM25 index over a fixed set of chunks, built once.
pub struct KeywordRetriever {
    docs: Vec<Document>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avg_len: f64,
    doc_freqs: HashMap<String, usize>,
}

impl KeywordRetriever {
    pub fn new(docs: Vec<Document>) -> Self {
        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_lens = Vec::with_capacity(docs.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for doc in &docs {
            let tokens = tokenize(&doc.content);
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / docs.len() as f64
        };

        Self {
            docs,
            term_freqs,
            doc_lens,
            avg_len,
            doc_freqs,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Top `k` chunks with a positive score, best first. Ties keep index order.
    pub fn search(&self, query: &str, k: usize) -> Vec<Document> {
        let mut query_terms = tokenize(query);
        query_terms.sort();
        query_terms.dedup();

        let mut scored: Vec<(usize, f64)> = (0..self.docs.len())
            .map(|i| (i, self.score(i, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.docs[i].clone())
            .collect()
    }

    fn score(&self, idx: usize, query_terms: &[String]) -> f64 {
        let n = self.docs.len() as f64;
        let len_norm = if self.avg_len > 0.0 {
            self.doc_lens[idx] as f64 / self.avg_len
        } else {
            0.0
        };
        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *self.term_freqs[idx].get(term)? as f64;
                let df = *self.doc_freqs.get(term)? as f64;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                Some(idf * tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * len_norm)))
            })
            .sum()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self.search(query, k))
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Lowercased alphanumeric/underscore runs.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> KeywordRetriever {
        KeywordRetriever::new(vec![
            Document::new("errors.md", "Handle errors with Result and the question mark operator."),
            Document::new("loops.md", "Prefer iterators over index loops. Iterators avoid bounds checks."),
            Document::new("naming.md", "Use snake_case for functions and variables."),
        ])
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("def add_one(x): return x+1"),
            vec!["def", "add_one", "x", "return", "x", "1"]
        );
    }

    #[test]
    fn test_search_ranks_relevant_first() {
        let results = corpus().search("for i in range: iterators loops", 3);
        assert_eq!(results[0].source, "loops.md");
    }

    #[test]
    fn test_search_respects_k_and_skips_zero_scores() {
        let retriever = corpus();
        assert_eq!(retriever.search("errors iterators snake_case", 2).len(), 2);
        assert!(retriever.search("kubernetes", 3).is_empty());
        assert!(retriever.search("", 3).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let retriever = KeywordRetriever::new(Vec::new());
        assert!(retriever.is_empty());
        assert!(retriever.search("anything", 4).is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_via_trait() {
        let retriever: &dyn Retriever = &corpus();
        let docs = retriever.retrieve("Result question mark", 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "errors.md");
        assert_eq!(retriever.name(), "bm25");
    }
}
