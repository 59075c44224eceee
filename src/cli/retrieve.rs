//! `code-explainer retrieve` - offline knowledge-base lookup.

use anyhow::{bail, Context, Result};

use code_explainer::config::Config;
use code_explainer::gateway::K_RANGE;

use super::serve::build_gateway;

pub async fn cmd_retrieve(config: Config, query: &str, k: usize) -> Result<()> {
    if !K_RANGE.contains(&k) {
        bail!("k must be between {} and {}", K_RANGE.start(), K_RANGE.end());
    }
    let gateway = build_gateway(&config)?;
    if !gateway.has_retriever() {
        bail!("no knowledge base available; set rag.docs_dir or CODE_EXPLAINER_DOCS_DIR");
    }

    let results = gateway
        .debug_retrieval(query, k)
        .await
        .context("retrieval failed")?;
    if results.is_empty() {
        println!("No matching passages.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        println!("[{}] {}", i + 1, result.source);
        println!("{}\n", result.preview);
    }
    Ok(())
}
