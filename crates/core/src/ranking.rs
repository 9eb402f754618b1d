//! Ranking configuration shared by the reranker, rank fusion, and the
//! file-based config.

use serde::{Deserialize, Serialize};

/// Weights and decay window for the heuristic reranker.
///
/// The weights are applied as given. They are expected to sum to at most
/// 1.0 so final scores stay in [0, 1], but nothing normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,

    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// Documents older than this score 0 on recency.
    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: f64,

    /// Maximum number of documents returned by a rerank.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_keyword_weight() -> f64 {
    0.3
}
fn default_vector_weight() -> f64 {
    0.5
}
fn default_recency_weight() -> f64 {
    0.2
}
fn default_recency_window_hours() -> f64 {
    168.0
}
fn default_top_k() -> usize {
    100
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            vector_weight: default_vector_weight(),
            recency_weight: default_recency_weight(),
            recency_window_hours: default_recency_window_hours(),
            top_k: default_top_k(),
        }
    }
}

impl RerankConfig {
    pub fn weight_sum(&self) -> f64 {
        self.keyword_weight + self.vector_weight + self.recency_weight
    }
}

/// Reciprocal Rank Fusion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// The RRF `k` constant; clamped to [10, 100] when used.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    #[serde(default = "default_rrf_weight")]
    pub rrf_weight: f64,

    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,
}

fn default_rrf_k() -> u32 {
    60
}
fn default_rrf_weight() -> f64 {
    0.8
}
fn default_similarity_weight() -> f64 {
    0.2
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            rrf_weight: default_rrf_weight(),
            similarity_weight: default_similarity_weight(),
        }
    }
}

impl FusionConfig {
    pub fn effective_k(&self) -> f64 {
        f64::from(self.rrf_k.clamp(10, 100))
    }

    /// Weights rescaled to sum to 1.0 (left as-is when already within
    /// 0.001, or when both are zero).
    pub fn normalized_weights(&self) -> (f64, f64) {
        let total = self.rrf_weight + self.similarity_weight;
        if (total - 1.0).abs() <= 0.001 || total <= 0.0 {
            (self.rrf_weight, self.similarity_weight)
        } else {
            (self.rrf_weight / total, self.similarity_weight / total)
        }
    }
}
