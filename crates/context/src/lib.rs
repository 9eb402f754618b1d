//! # Strata Context
//!
//! Builds a single prompt string out of heterogeneous context under a
//! strict token budget.
//!
//! ## Pipeline
//!
//! ```text
//! documents ──► Reranker ──┐
//!                          ▼
//! system / task / history / summaries ──► SmartContextAssembler
//!        populate → dedup → prune tier 4 → prune tier 2 (+ summarize) → render
//! ```
//!
//! Every pruning and summarization decision is appended to the
//! [`DriftMonitor`](drift::DriftMonitor).

pub mod assembler;
pub mod budget;
pub mod drift;
pub mod pipeline;
pub mod prune;
pub mod summarizer;
pub mod tier;

pub use assembler::{AssembledContext, AssemblyReport, AssemblyRequest, ConversationTurn, SmartContextAssembler, TierStats};
pub use budget::{BudgetManager, TierAllocations};
pub use drift::{DriftEvent, DriftKind, DriftMonitor, DriftSink, TracingSink};
pub use pipeline::{ContextPipeline, PreparedContext};
pub use summarizer::{RollingSummarizer, Summarizer, fallback_summary};
pub use tier::TierManager;
