//! # Strata Retrieval
//!
//! Everything that happens to retrieved documents before they reach the
//! context assembler:
//!
//! - [`tokenizer`]: entity-aware text-to-token-set strategies
//! - [`rerank`]: the multi-signal heuristic reranker
//! - [`fusion`]: Reciprocal Rank Fusion over several ranked result lists

pub mod fusion;
pub mod rerank;
pub mod tokenizer;

pub use fusion::{FusedResult, RankFusion, ScoredDocument};
pub use rerank::{FastReranker, Reranker};
pub use tokenizer::{CodeTokenizer, DefaultTokenizer, TextTokenizer, TokenSet, TokenizerRegistry, TokenizerStrategy};
