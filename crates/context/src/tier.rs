//! Tier manager: context items bucketed by tier.
//!
//! Pure storage; every policy decision lives in the assembler.

use strata_core::{ContextItem, Tier};

#[derive(Debug, Clone, Default)]
pub struct TierManager {
    tiers: [Vec<ContextItem>; 5],
}

impl TierManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every item in every tier.
    pub fn reset(&mut self) {
        for items in &mut self.tiers {
            items.clear();
        }
    }

    /// Append an item to the tier it names.
    pub fn add_item(&mut self, item: ContextItem) {
        self.tiers[item.tier.ordinal()].push(item);
    }

    pub fn items(&self, tier: Tier) -> &[ContextItem] {
        &self.tiers[tier.ordinal()]
    }

    /// Replace a tier's contents. Items are re-tagged with `tier`.
    pub fn set_items(&mut self, tier: Tier, items: Vec<ContextItem>) {
        self.tiers[tier.ordinal()] = items
            .into_iter()
            .map(|mut item| {
                item.tier = tier;
                item
            })
            .collect();
    }

    /// Remove and return a tier's contents.
    pub fn take_items(&mut self, tier: Tier) -> Vec<ContextItem> {
        std::mem::take(&mut self.tiers[tier.ordinal()])
    }

    pub fn tier_usage(&self, tier: Tier) -> usize {
        self.items(tier).iter().map(|item| item.tokens).sum()
    }

    pub fn total_tokens(&self) -> usize {
        Tier::ALL.iter().map(|&tier| self.tier_usage(tier)).sum()
    }

    pub fn item_count(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    /// Every item, tier 0 first, insertion order within a tier.
    pub fn all_items_in_tier_order(&self) -> impl Iterator<Item = &ContextItem> {
        self.tiers.iter().flatten()
    }
}
