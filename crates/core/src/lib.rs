//! # Strata Core
//!
//! Domain types, traits, and error definitions shared by every Strata crate:
//! tiered context items, retrieved documents, token budgets, ranking
//! configuration, and the text-generation seam.
//!
//! Implementations live in their respective crates; everything here is
//! plain data plus the traits they are written against.

pub mod budget;
pub mod document;
pub mod error;
pub mod generation;
pub mod item;
pub mod ranking;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use budget::{BudgetPatch, ContextBudget, ReservedTokens, TierLimits};
pub use document::{Document, DocumentMetadata, EntityType, RerankAnnotation, TimestampField, TimestampValue};
pub use error::{BudgetError, Error, GenerationError, Result};
pub use generation::{GenerationRequest, GenerationResponse, TextGenerator};
pub use item::{ContextItem, ItemType, Tier};
pub use ranking::{FusionConfig, RerankConfig};
pub use token::{HeuristicTokenCounter, TokenCounter, estimate_tokens};
