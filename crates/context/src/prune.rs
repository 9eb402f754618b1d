//! Pruning policies as pure functions.
//!
//! Both policies walk items in priority order and keep each one whose
//! tokens still fit under the budget. Priority only decides who gets the
//! budget; the returned halves keep a stable display order. An item that does not fit is dropped
//! and the walk continues, so a smaller lower-priority item may still be
//! kept.

use strata_core::ContextItem;

/// Items split into what stays and what goes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneOutcome {
    pub kept: Vec<ContextItem>,
    pub dropped: Vec<ContextItem>,
}

impl PruneOutcome {
    pub fn kept_tokens(&self) -> usize {
        self.kept.iter().map(|item| item.tokens).sum()
    }

    pub fn dropped_tokens(&self) -> usize {
        self.dropped.iter().map(|item| item.tokens).sum()
    }
}

fn keep_greedily(ordered: Vec<ContextItem>, budget: usize) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();
    let mut used = 0usize;
    for item in ordered {
        if used + item.tokens <= budget {
            used += item.tokens;
            outcome.kept.push(item);
        } else {
            outcome.dropped.push(item);
        }
    }
    outcome
}

/// Highest score claims the budget first; equal scores go in input order.
/// Both halves come back in input order, so an upstream ranking survives.
pub fn prune_by_score(items: Vec<ContextItem>, budget: usize) -> PruneOutcome {
    let mut by_score: Vec<usize> = (0..items.len()).collect();
    by_score.sort_by(|&a, &b| items[b].score.total_cmp(&items[a].score));

    let mut keep = vec![false; items.len()];
    let mut used = 0usize;
    for index in by_score {
        let tokens = items[index].tokens;
        if used + tokens <= budget {
            used += tokens;
            keep[index] = true;
        }
    }

    let mut outcome = PruneOutcome::default();
    for (item, kept) in items.into_iter().zip(keep) {
        if kept {
            outcome.kept.push(item);
        } else {
            outcome.dropped.push(item);
        }
    }
    outcome
}

/// Newest first. Both halves come back oldest to newest.
pub fn prune_oldest_first(mut items: Vec<ContextItem>, budget: usize) -> PruneOutcome {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let mut outcome = keep_greedily(items, budget);
    outcome.kept.reverse();
    outcome.dropped.reverse();
    outcome
}
