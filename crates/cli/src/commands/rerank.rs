//! `strata rerank`: heuristic reranking of a document list.

use std::path::Path;

use strata_core::Document;
use strata_retrieval::{FastReranker, Reranker};

pub async fn run(
    config_path: Option<&Path>,
    query: &str,
    input: &Path,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let documents: Vec<Document> = super::read_json(input)?;

    let top_k = top_k.unwrap_or(config.rerank.top_k);
    let reranker = FastReranker::new(config.rerank);
    let ranked = reranker.rerank(query, documents, top_k);

    tracing::debug!(query, kept = ranked.len(), "Rerank complete");
    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}
