//! Budget manager: per-tier limits, allocations, and fit checks.

use serde::{Deserialize, Serialize};
use strata_core::budget::DEFAULT_RESERVED_TOKENS;
use strata_core::{BudgetError, BudgetPatch, ContextBudget, Tier};

/// Fallback shares of the available tokens for tiers without an explicit
/// limit: working set, condensed history, long-term memory.
const WORKING_SET_SHARE: f64 = 0.4;
const CONDENSED_HISTORY_SHARE: f64 = 0.1;
const LONG_TERM_MEMORY_SHARE: f64 = 0.3;

/// Token allocation per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAllocations {
    pub immutable: usize,
    pub active_task: usize,
    pub working_set: usize,
    pub condensed_history: usize,
    pub long_term_memory: usize,
}

impl TierAllocations {
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Immutable => self.immutable,
            Tier::ActiveTask => self.active_task,
            Tier::WorkingSet => self.working_set,
            Tier::CondensedHistory => self.condensed_history,
            Tier::LongTermMemory => self.long_term_memory,
        }
    }
}

/// Holds a validated [`ContextBudget`] and answers budget questions.
#[derive(Debug, Clone)]
pub struct BudgetManager {
    budget: ContextBudget,
}

impl BudgetManager {
    /// Validate and wrap a budget.
    pub fn new(budget: ContextBudget) -> Result<Self, BudgetError> {
        budget.validate()?;
        Ok(Self { budget })
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    pub fn total_limit(&self) -> usize {
        self.budget.total_token_limit
    }

    /// Sub-budget for retrieved documents.
    pub fn rag_budget(&self) -> usize {
        self.budget.rag_budget()
    }

    /// Configured limit for a tier, or the total limit.
    pub fn tier_limit(&self, tier: Tier) -> usize {
        self.budget
            .limit_for(tier)
            .unwrap_or(self.budget.total_token_limit)
    }

    /// Reservation for a protected tier (0 for the others).
    pub fn reserved(&self, tier: Tier) -> usize {
        if tier.is_protected() {
            self.budget
                .reserved_for(tier)
                .unwrap_or(DEFAULT_RESERVED_TOKENS)
        } else {
            0
        }
    }

    /// Whether an item fits into a tier that already holds `usage` tokens.
    /// Protected tiers always fit.
    pub fn can_fit(&self, tier: Tier, item_tokens: usize, usage: usize) -> bool {
        if tier.is_protected() {
            return true;
        }
        usage.saturating_add(item_tokens) <= self.tier_limit(tier)
    }

    /// Per-tier allocation of `total_available` tokens.
    pub fn allocations(&self, total_available: usize) -> TierAllocations {
        let share = |tier: Tier, fraction: f64| {
            self.budget
                .limit_for(tier)
                .unwrap_or((total_available as f64 * fraction) as usize)
        };
        TierAllocations {
            immutable: self.reserved(Tier::Immutable),
            active_task: self.reserved(Tier::ActiveTask),
            working_set: share(Tier::WorkingSet, WORKING_SET_SHARE),
            condensed_history: share(Tier::CondensedHistory, CONDENSED_HISTORY_SHARE),
            long_term_memory: share(Tier::LongTermMemory, LONG_TERM_MEMORY_SHARE),
        }
    }

    /// Merge overrides into the budget. The current budget is kept when
    /// the merged result does not validate.
    pub fn update_budget(&mut self, patch: BudgetPatch) -> Result<(), BudgetError> {
        let mut next = self.budget.clone();
        next.apply(patch);
        next.validate()?;
        tracing::debug!(
            total = next.total_token_limit,
            rag = next.rag_budget(),
            "Context budget updated"
        );
        self.budget = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_budget_rejected_at_construction() {
        assert_eq!(
            BudgetManager::new(ContextBudget::with_total(0)).unwrap_err(),
            BudgetError::ZeroTotal
        );
    }

    #[test]
    fn tier_limit_falls_back_to_total() {
        let manager = BudgetManager::new(ContextBudget::with_total(5000)).unwrap();
        assert_eq!(manager.tier_limit(Tier::WorkingSet), 5000);

        let manager = BudgetManager::new(ContextBudget::default()).unwrap();
        assert_eq!(manager.tier_limit(Tier::WorkingSet), 60_000);
        assert_eq!(manager.tier_limit(Tier::CondensedHistory), 10_000);
    }

    #[test]
    fn protected_tiers_always_fit() {
        let manager = BudgetManager::new(ContextBudget::with_total(10)).unwrap();
        assert!(manager.can_fit(Tier::Immutable, 1_000_000, 0));
        assert!(manager.can_fit(Tier::ActiveTask, 1_000_000, 1_000_000));
    }

    #[test]
    fn can_fit_is_inclusive() {
        let mut budget = ContextBudget::with_total(1000);
        budget.tier_limits.condensed_history = Some(100);
        let manager = BudgetManager::new(budget).unwrap();
        assert!(manager.can_fit(Tier::CondensedHistory, 40, 60));
        assert!(!manager.can_fit(Tier::CondensedHistory, 41, 60));
    }

    #[test]
    fn allocations_use_shares_when_unset() {
        let manager = BudgetManager::new(ContextBudget::with_total(10_000)).unwrap();
        let alloc = manager.allocations(10_000);
        assert_eq!(alloc.immutable, 2000);
        assert_eq!(alloc.active_task, 2000);
        assert_eq!(alloc.working_set, 4000);
        assert_eq!(alloc.condensed_history, 1000);
        assert_eq!(alloc.long_term_memory, 3000);
    }

    #[test]
    fn allocations_prefer_configured_limits() {
        let manager = BudgetManager::new(ContextBudget::default()).unwrap();
        let alloc = manager.allocations(1000);
        assert_eq!(alloc.get(Tier::WorkingSet), 60_000);
        assert_eq!(alloc.get(Tier::LongTermMemory), 40_000);
    }

    #[test]
    fn update_budget_merges_and_revalidates() {
        let mut manager = BudgetManager::new(ContextBudget::with_total(1000)).unwrap();
        manager
            .update_budget(BudgetPatch {
                rag_token_limit: Some(200),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(manager.rag_budget(), 200);

        let err = manager
            .update_budget(BudgetPatch {
                total_token_limit: Some(100),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BudgetError::RagExceedsTotal { .. }));
        // Rejected patch leaves the previous budget in place.
        assert_eq!(manager.total_limit(), 1000);
    }
}
