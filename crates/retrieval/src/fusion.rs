//! Reciprocal Rank Fusion over result lists from several query variants.
//!
//! Each list contributes `1 / (k + rank + 1)` for every document it
//! contains (rank is zero-based). The sum is normalized by the number of
//! lists and blended with the document's best retriever score:
//!
//! `final = rrf_weight * rrf / lists + similarity_weight * best_score`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_core::{Document, FusionConfig};

/// A document with the score one retriever gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(document: Document, score: f64) -> Self {
        Self { document, score }
    }

    /// Take the score from the document's own metadata (0 when absent).
    pub fn from_document(document: Document) -> Self {
        let score = document.metadata.relevance_score().unwrap_or(0.0);
        Self { document, score }
    }
}

/// One fused document and how it got its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    pub document: Document,
    pub best_score: f64,
    pub sum_score: f64,
    /// Number of lists the document appeared in.
    pub hits: usize,
    /// Zero-based rank in each list it appeared in.
    pub ranks: Vec<usize>,
    /// Unnormalized reciprocal-rank sum.
    pub rrf_score: f64,
    pub final_score: f64,
}

/// Reciprocal Rank Fusion.
#[derive(Debug, Clone, Default)]
pub struct RankFusion {
    config: FusionConfig,
}

impl RankFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Fuse lists, identifying documents by [`Document::dedup_key`].
    pub fn fuse(&self, lists: &[Vec<ScoredDocument>]) -> Vec<FusedResult> {
        self.fuse_by(lists, Document::dedup_key)
    }

    /// Fuse lists, identifying documents with a caller-supplied key.
    ///
    /// The first occurrence of a document is the one returned. Results are
    /// sorted by final score, descending; ties keep first-seen order.
    pub fn fuse_by<F>(&self, lists: &[Vec<ScoredDocument>], key: F) -> Vec<FusedResult>
    where
        F: Fn(&Document) -> String,
    {
        if lists.is_empty() {
            return Vec::new();
        }

        let k = self.config.effective_k();
        let (rrf_weight, similarity_weight) = self.config.normalized_weights();

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut fused: Vec<FusedResult> = Vec::new();

        for list in lists {
            for (rank, entry) in list.iter().enumerate() {
                let score = if entry.score.is_finite() { entry.score } else { 0.0 };
                let id = key(&entry.document);
                match index.get(&id) {
                    Some(&at) => {
                        let hit = &mut fused[at];
                        hit.hits += 1;
                        hit.sum_score += score;
                        hit.ranks.push(rank);
                        if score > hit.best_score {
                            hit.best_score = score;
                        }
                    }
                    None => {
                        index.insert(id, fused.len());
                        fused.push(FusedResult {
                            document: entry.document.clone(),
                            best_score: score,
                            sum_score: score,
                            hits: 1,
                            ranks: vec![rank],
                            rrf_score: 0.0,
                            final_score: 0.0,
                        });
                    }
                }
            }
        }

        let list_count = lists.len() as f64;
        for hit in &mut fused {
            hit.rrf_score = hit
                .ranks
                .iter()
                .map(|&rank| 1.0 / (k + rank as f64 + 1.0))
                .sum();
            hit.final_score =
                rrf_weight * (hit.rrf_score / list_count) + similarity_weight * hit.best_score;
        }

        fused.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        tracing::debug!(lists = lists.len(), documents = fused.len(), "Fused ranked lists");
        fused
    }
}
