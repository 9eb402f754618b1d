//! `strata fuse`: Reciprocal Rank Fusion over several result files.
//!
//! Each input is a JSON array of documents in ranked order. A document's
//! similarity is read from its metadata score fields.

use std::path::{Path, PathBuf};

use strata_core::Document;
use strata_retrieval::{RankFusion, ScoredDocument};

pub async fn run(
    config_path: Option<&Path>,
    inputs: &[PathBuf],
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let mut lists = Vec::with_capacity(inputs.len());
    for input in inputs {
        let documents: Vec<Document> = super::read_json(input)?;
        lists.push(documents.into_iter().map(ScoredDocument::from_document).collect::<Vec<_>>());
    }

    let mut fused = RankFusion::new(config.fusion).fuse(&lists);
    if let Some(top_k) = top_k {
        fused.truncate(top_k);
    }

    tracing::debug!(lists = lists.len(), results = fused.len(), "Fusion complete");
    println!("{}", serde_json::to_string_pretty(&fused)?);
    Ok(())
}
