//! Multi-signal heuristic reranking.
//!
//! [`FastReranker`] reorders retrieved documents without a model call by
//! blending three signals, each in [0, 1]:
//!
//! - **keyword**: query-token overlap with the document, with boosts for an
//!   exact phrase hit and for whole-word hits in typed entities
//! - **vector**: the relevance score the retriever already attached
//! - **recency**: linear decay over a configurable window
//!
//! The weighted sum orders the output. Ties keep input order.

use std::sync::Arc;

use regex_lite::Regex;
use strata_core::{Document, RerankAnnotation, RerankConfig};

use crate::tokenizer::{TokenSet, TokenizerRegistry, TokenizerStrategy};

const PHRASE_BOOST: f64 = 0.2;
const WHOLE_WORD_BOOST: f64 = 0.1;
const WHOLE_WORD_BOOST_CAP: f64 = 0.3;
const NEUTRAL_SCORE: f64 = 0.5;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Reorders documents by estimated relevance to a query.
pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;

    /// Return at most `top_k` documents, best first.
    fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Vec<Document>;
}

/// Per-document signal breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalScores {
    pub keyword: f64,
    pub vector: f64,
    pub recency: f64,
    pub total: f64,
}

/// The keyword / vector / recency heuristic reranker.
#[derive(Debug, Clone)]
pub struct FastReranker {
    config: RerankConfig,
    tokenizers: Arc<TokenizerRegistry>,
}

impl FastReranker {
    pub fn new(config: RerankConfig) -> Self {
        Self::with_tokenizers(config, Arc::new(TokenizerRegistry::new()))
    }

    pub fn with_tokenizers(config: RerankConfig, tokenizers: Arc<TokenizerRegistry>) -> Self {
        let weight_sum = config.weight_sum();
        if weight_sum > 1.0 + 1e-9 {
            tracing::warn!(
                weight_sum,
                "Rerank weights sum to more than 1.0; final scores may exceed 1.0"
            );
        }
        Self { config, tokenizers }
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    /// Rerank with the configured `top_k`.
    pub fn rerank_default(&self, query: &str, documents: Vec<Document>) -> Vec<Document> {
        self.rerank(query, documents, self.config.top_k)
    }

    /// Rerank relative to an explicit clock (epoch milliseconds).
    pub fn rerank_at(
        &self,
        query: &str,
        documents: Vec<Document>,
        top_k: usize,
        now_millis: i64,
    ) -> Vec<Document> {
        if documents.len() <= 1 {
            return documents;
        }

        let query_tokens = self.tokenizers.get(TokenizerStrategy::Default).tokenize(query);
        let matchers = whole_word_matchers(&query_tokens);
        let phrase = query_tokens.phrase();

        let mut scored: Vec<(SignalScores, Document)> = documents
            .into_iter()
            .map(|doc| {
                let keyword = self.keyword_score(&query_tokens, &phrase, &matchers, &doc);
                let scores = self.combine(keyword, &doc, now_millis);
                (scores, doc)
            })
            .collect();

        // Stable: equal totals keep input order.
        scored.sort_by(|a, b| b.0.total.total_cmp(&a.0.total));

        let kept = top_k.min(scored.len());
        tracing::debug!(
            candidates = scored.len(),
            kept,
            query_tokens = query_tokens.len(),
            "Reranked documents"
        );

        scored
            .into_iter()
            .take(kept)
            .enumerate()
            .map(|(rank, (scores, mut doc))| {
                doc.metadata.score = Some(scores.total);
                doc.metadata.rerank = Some(RerankAnnotation {
                    rerank_score: scores.total * 10.0,
                    keyword_score: scores.keyword,
                    vector_score: scores.vector,
                    recency_score: scores.recency,
                    rerank_rank: rank,
                    was_reranked: true,
                });
                doc
            })
            .collect()
    }

    /// Score one document without reordering anything.
    pub fn score(&self, query: &str, doc: &Document, now_millis: i64) -> SignalScores {
        let query_tokens = self.tokenizers.get(TokenizerStrategy::Default).tokenize(query);
        let matchers = whole_word_matchers(&query_tokens);
        let keyword = self.keyword_score(&query_tokens, &query_tokens.phrase(), &matchers, doc);
        self.combine(keyword, doc, now_millis)
    }

    fn combine(&self, keyword: f64, doc: &Document, now_millis: i64) -> SignalScores {
        let vector = vector_score(doc);
        let recency = recency_score(doc, now_millis, self.config.recency_window_hours);
        let total = self.config.keyword_weight * keyword
            + self.config.vector_weight * vector
            + self.config.recency_weight * recency;
        SignalScores {
            keyword,
            vector,
            recency,
            total,
        }
    }

    fn keyword_score(
        &self,
        query_tokens: &TokenSet,
        phrase: &str,
        matchers: &[Regex],
        doc: &Document,
    ) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let entity = doc.metadata.inferred_entity_type();
        let doc_tokens = self.tokenizers.for_entity(entity).tokenize(&doc.page_content);

        let matched = query_tokens.iter().filter(|t| doc_tokens.contains(t)).count();
        let mut score = matched as f64 / query_tokens.len() as f64;

        if doc.page_content.to_lowercase().contains(phrase) {
            score += PHRASE_BOOST;
        }

        if entity.is_some() {
            let hits = matchers
                .iter()
                .filter(|re| re.is_match(&doc.page_content))
                .count();
            score += (hits as f64 * WHOLE_WORD_BOOST).min(WHOLE_WORD_BOOST_CAP);
        }

        score.min(1.0)
    }
}

impl Reranker for FastReranker {
    fn name(&self) -> &str {
        "fast"
    }

    fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Vec<Document> {
        self.rerank_at(query, documents, top_k, chrono::Utc::now().timestamp_millis())
    }
}

/// Case-insensitive whole-word patterns, one per ASCII query token.
///
/// `regex-lite` word boundaries and case folding are ASCII-only, so a
/// token like "café" could never match reliably. Non-ASCII tokens still
/// count through token overlap and get no whole-word boost.
fn whole_word_matchers(query_tokens: &TokenSet) -> Vec<Regex> {
    query_tokens
        .iter()
        .filter(|token| token.is_ascii())
        .filter_map(|token| Regex::new(&format!(r"(?i)\b{}\b", regex_lite::escape(token))).ok())
        .collect()
}

/// Retriever score clamped to [0, 1]; 0.5 when absent.
pub fn vector_score(doc: &Document) -> f64 {
    doc.metadata
        .relevance_score()
        .unwrap_or(NEUTRAL_SCORE)
        .clamp(0.0, 1.0)
}

/// Linear decay from 1.0 (now or future) to 0.0 (at or beyond the window);
/// 0.5 when the document has no usable timestamp.
pub fn recency_score(doc: &Document, now_millis: i64, window_hours: f64) -> f64 {
    let Some(timestamp) = doc.metadata.timestamp_millis() else {
        return NEUTRAL_SCORE;
    };

    let age_hours = now_millis.saturating_sub(timestamp) as f64 / MILLIS_PER_HOUR;
    if age_hours <= 0.0 {
        1.0
    } else if age_hours >= window_hours {
        0.0
    } else {
        1.0 - age_hours / window_hours
    }
}
