//! Token budget configuration.
//!
//! A [`ContextBudget`] bounds the size of an assembled context: one total
//! limit, an optional sub-budget for retrieved documents, reservations for
//! the protected tiers, and optional caps for the prunable tiers. Unset
//! values fall back at the point of use (see `BudgetManager` in
//! `strata-context`).

use crate::error::BudgetError;
use crate::item::Tier;
use serde::{Deserialize, Serialize};

/// Share of the total limit given to retrieved documents when no explicit
/// RAG limit is set.
pub const DEFAULT_RAG_SHARE: f64 = 0.6;

/// Reservation for tiers 0 and 1 when none is configured.
pub const DEFAULT_RESERVED_TOKENS: usize = 2000;

/// Token budget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBudget {
    /// Hard ceiling for the whole rendered context.
    pub total_token_limit: usize,

    /// Sub-budget for tier 4. Defaults to 60% of the total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_token_limit: Option<usize>,

    #[serde(default)]
    pub reserved_tokens: ReservedTokens,

    #[serde(default)]
    pub tier_limits: TierLimits,
}

/// Reservations for the protected tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task: Option<usize>,
}

/// Caps for the prunable tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_set: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condensed_history: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_memory: Option<usize>,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            total_token_limit: 128_000,
            rag_token_limit: None,
            reserved_tokens: ReservedTokens {
                immutable: Some(DEFAULT_RESERVED_TOKENS),
                active_task: Some(DEFAULT_RESERVED_TOKENS),
            },
            tier_limits: TierLimits {
                working_set: Some(60_000),
                condensed_history: Some(10_000),
                long_term_memory: Some(40_000),
            },
        }
    }
}

impl ContextBudget {
    /// A budget with only the total set; everything else scales from it.
    pub fn with_total(total_token_limit: usize) -> Self {
        Self {
            total_token_limit,
            rag_token_limit: None,
            reserved_tokens: ReservedTokens::default(),
            tier_limits: TierLimits::default(),
        }
    }

    pub fn with_rag_limit(mut self, rag_token_limit: usize) -> Self {
        self.rag_token_limit = Some(rag_token_limit);
        self
    }

    /// Configured RAG limit, or 60% of the total.
    pub fn rag_budget(&self) -> usize {
        self.rag_token_limit
            .unwrap_or_else(|| (self.total_token_limit as f64 * DEFAULT_RAG_SHARE) as usize)
    }

    /// Explicit reservation for a protected tier.
    pub fn reserved_for(&self, tier: Tier) -> Option<usize> {
        match tier {
            Tier::Immutable => self.reserved_tokens.immutable,
            Tier::ActiveTask => self.reserved_tokens.active_task,
            _ => None,
        }
    }

    /// Explicit cap for a prunable tier.
    pub fn limit_for(&self, tier: Tier) -> Option<usize> {
        match tier {
            Tier::WorkingSet => self.tier_limits.working_set,
            Tier::CondensedHistory => self.tier_limits.condensed_history,
            Tier::LongTermMemory => self.tier_limits.long_term_memory,
            _ => None,
        }
    }

    /// Reject budgets that can never be satisfied.
    pub fn validate(&self) -> Result<(), BudgetError> {
        let total = self.total_token_limit;
        if total == 0 {
            return Err(BudgetError::ZeroTotal);
        }

        match self.rag_token_limit {
            Some(0) => return Err(BudgetError::ZeroRagLimit),
            Some(rag) if rag > total => return Err(BudgetError::RagExceedsTotal { rag, total }),
            _ => {}
        }

        for tier in [Tier::WorkingSet, Tier::CondensedHistory, Tier::LongTermMemory] {
            if self.limit_for(tier) == Some(0) {
                return Err(BudgetError::ZeroTierLimit { tier });
            }
        }

        let reserved = self.reserved_tokens.immutable.unwrap_or(0)
            + self.reserved_tokens.active_task.unwrap_or(0);
        if reserved > total {
            return Err(BudgetError::ReservedExceedsTotal { reserved, total });
        }

        Ok(())
    }

    /// Merge a partial override into this budget.
    pub fn apply(&mut self, patch: BudgetPatch) {
        if let Some(total) = patch.total_token_limit {
            self.total_token_limit = total;
        }
        if let Some(rag) = patch.rag_token_limit {
            self.rag_token_limit = Some(rag);
        }
        if let Some(reserved) = patch.reserved_immutable {
            self.reserved_tokens.immutable = Some(reserved);
        }
        if let Some(reserved) = patch.reserved_active_task {
            self.reserved_tokens.active_task = Some(reserved);
        }
        if let Some(limit) = patch.working_set_limit {
            self.tier_limits.working_set = Some(limit);
        }
        if let Some(limit) = patch.condensed_history_limit {
            self.tier_limits.condensed_history = Some(limit);
        }
        if let Some(limit) = patch.long_term_memory_limit {
            self.tier_limits.long_term_memory = Some(limit);
        }
    }
}

/// Partial budget override. `None` fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetPatch {
    pub total_token_limit: Option<usize>,
    pub rag_token_limit: Option<usize>,
    pub reserved_immutable: Option<usize>,
    pub reserved_active_task: Option<usize>,
    pub working_set_limit: Option<usize>,
    pub condensed_history_limit: Option<usize>,
    pub long_term_memory_limit: Option<usize>,
}
