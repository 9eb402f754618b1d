//! Error types for the Strata domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use crate::item::Tier;
use thiserror::Error;

/// The top-level error type for all Strata operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Budget errors ---
    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A token budget that can never be satisfied, rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("total token limit must be greater than zero")]
    ZeroTotal,

    #[error("RAG token limit must be greater than zero")]
    ZeroRagLimit,

    #[error("RAG token limit ({rag}) exceeds total token limit ({total})")]
    RagExceedsTotal { rag: usize, total: usize },

    #[error("tier limit for {tier} must be greater than zero")]
    ZeroTierLimit { tier: Tier },

    #[error("reserved tokens ({reserved}) exceed total token limit ({total})")]
    ReservedExceedsTotal { reserved: usize, total: usize },
}

/// Failures from a text-generation collaborator.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generator returned no text")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_displays_correctly() {
        let err = Error::Generation(GenerationError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn budget_error_names_the_tier() {
        let err = Error::from(BudgetError::ZeroTierLimit {
            tier: Tier::WorkingSet,
        });
        assert!(err.to_string().contains("working_set"));
    }

    #[test]
    fn rag_limit_error_reports_both_values() {
        let err = BudgetError::RagExceedsTotal {
            rag: 5000,
            total: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000"));
        assert!(msg.contains("1000"));
    }
}
