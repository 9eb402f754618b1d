//! Smart context assembler: the core of Strata.
//!
//! Builds one prompt string from five tiers of context:
//!
//! 0. **Immutable**: system instructions, never pruned
//! 1. **Active task**: current task state, never pruned, rendered last
//! 2. **Working set**: conversation turns, oldest dropped first and summarized
//! 3. **Condensed history**: summaries of earlier turns
//! 4. **Long-term memory**: retrieved documents, lowest score dropped first
//!
//! # Algorithm
//!
//! 1. Populate a fresh [`TierManager`] (documents deduplicated by id and by
//!    content hash)
//! 2. Prune tier 4 against the RAG sub-budget when it, or the whole
//!    context, is over budget
//! 3. If still over the total, prune tier 2 into the space the other tiers
//!    leave, and replace what was dropped with a tier 3 summary
//! 4. Render: 0, 3, 4, 2, 1, separated by blank lines
//!
//! Assembly never fails on overflow. When tiers 0 and 1 alone exceed the
//! total limit a warning is logged and the report is flagged.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strata_core::{
    BudgetError, BudgetPatch, ContextBudget, ContextItem, Document, HeuristicTokenCounter, ItemType, Tier,
    TokenCounter,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::budget::{BudgetManager, TierAllocations};
use crate::drift::{DriftEvent, DriftKind, DriftMonitor};
use crate::prune::{PruneOutcome, prune_by_score, prune_oldest_first};
use crate::summarizer::{RollingSummarizer, Summarizer};
use crate::tier::TierManager;

/// Prefix of the tier 3 item written when history is summarized.
pub const SUMMARY_PREFIX: &str = "[Previous Context Summary]:";

const SECTION_SEPARATOR: &str = "\n\n";

/// Spacing between consecutive turns that carry no timestamp.
const TURN_SPACING_MS: i64 = 1000;

// ── Types ─────────────────────────────────────────────────────────────────

/// One conversation turn for the working set.
///
/// Deserializes from either a bare string or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TurnRepr")]
pub struct ConversationTurn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub content: String,
    /// Epoch milliseconds. Missing timestamps are spaced one second apart,
    /// ending just before assembly time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TurnRepr {
    Text(String),
    Full {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        role: Option<String>,
        content: String,
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

impl From<TurnRepr> for ConversationTurn {
    fn from(repr: TurnRepr) -> Self {
        match repr {
            TurnRepr::Text(content) => ConversationTurn::new(content),
            TurnRepr::Full {
                id,
                role,
                content,
                timestamp,
            } => ConversationTurn {
                id,
                role,
                content,
                timestamp,
            },
        }
    }
}

impl ConversationTurn {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: None,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn rendered(&self) -> String {
        match self.role.as_deref() {
            Some(role) if !role.is_empty() => format!("{role}: {}", self.content),
            _ => self.content.clone(),
        }
    }
}

impl From<&str> for ConversationTurn {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

/// Everything the assembler may place into a context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub system_instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task: Option<String>,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Summaries carried over from earlier runs, oldest first.
    #[serde(default)]
    pub summaries: Vec<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl AssemblyRequest {
    pub fn new(system_instructions: impl Into<String>) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            ..Default::default()
        }
    }

    pub fn with_active_task(mut self, task: impl Into<String>) -> Self {
        self.active_task = Some(task.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_summaries(mut self, summaries: Vec<String>) -> Self {
        self.summaries = summaries;
        self
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }
}

/// The assembled context plus a report of how it was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    pub context: String,
    pub report: AssemblyReport,
}

/// How an assembly run spent its budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub run_id: Uuid,
    /// Tokens across all tiers after pruning.
    pub total_tokens: usize,
    pub budget: usize,
    pub rag_budget: usize,
    /// Total tokens as a percentage of the budget.
    pub utilization_pct: f32,
    /// The final context is larger than the budget.
    pub over_budget: bool,
    /// Tiers 0 and 1 alone exceed the budget.
    pub protected_overflow: bool,
    pub duplicates_removed: usize,
    pub tiers: Vec<TierStats>,
    pub allocations: TierAllocations,
    pub drift_events: Vec<DriftEvent>,
}

/// Token statistics for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: Tier,
    pub tokens: usize,
    pub items_included: usize,
    /// Items before pruning (after deduplication).
    pub items_total: usize,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Budget-aware context assembler.
///
/// Holds no per-run state, so one instance can serve concurrent calls.
pub struct SmartContextAssembler {
    budget: BudgetManager,
    counter: Arc<dyn TokenCounter>,
    summarizer: Arc<dyn Summarizer>,
    drift: Arc<DriftMonitor>,
}

impl std::fmt::Debug for SmartContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartContextAssembler")
            .field("budget", self.budget.budget())
            .field("drift", &self.drift)
            .finish()
    }
}

impl SmartContextAssembler {
    /// Assembler with the heuristic token counter, local summaries, and a
    /// private drift monitor.
    pub fn new(budget: ContextBudget) -> Result<Self, BudgetError> {
        Ok(Self {
            budget: BudgetManager::new(budget)?,
            counter: Arc::new(HeuristicTokenCounter),
            summarizer: Arc::new(RollingSummarizer::local()),
            drift: Arc::new(DriftMonitor::new()),
        })
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_drift_monitor(mut self, drift: Arc<DriftMonitor>) -> Self {
        self.drift = drift;
        self
    }

    pub fn budget(&self) -> &BudgetManager {
        &self.budget
    }

    pub fn drift_monitor(&self) -> &Arc<DriftMonitor> {
        &self.drift
    }

    /// Merge budget overrides; rejected patches leave the budget unchanged.
    pub fn update_budget(&mut self, patch: BudgetPatch) -> Result<(), BudgetError> {
        self.budget.update_budget(patch)
    }

    /// System instructions plus optional documents, rendered to a string.
    pub async fn assemble_context(&self, system_instructions: &str, documents: Option<Vec<Document>>) -> String {
        let request = AssemblyRequest::new(system_instructions).with_documents(documents.unwrap_or_default());
        self.assemble(request).await.context
    }

    /// Assemble a context and report how the budget was spent.
    pub async fn assemble(&self, request: AssemblyRequest) -> AssembledContext {
        let run_id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();
        let total_limit = self.budget.total_limit();
        let rag_budget = self.budget.rag_budget();
        let has_active_task = request.active_task.is_some();

        let mut tiers = TierManager::new();
        let duplicates_removed = self.populate(&mut tiers, request, now);
        let items_total: Vec<usize> = Tier::ALL.iter().map(|&t| tiers.items(t).len()).collect();

        let protected = tiers.tier_usage(Tier::Immutable) + tiers.tier_usage(Tier::ActiveTask);
        let protected_overflow = protected > total_limit;
        if protected_overflow {
            warn!(
                protected_tokens = protected,
                budget = total_limit,
                "System instructions and active task exceed the total token budget"
            );
        }

        let mut events = Vec::new();

        // ── Tier 4: retrieved documents against the RAG sub-budget ─────────
        if tiers.total_tokens() > total_limit || tiers.tier_usage(Tier::LongTermMemory) > rag_budget {
            let outcome = prune_by_score(tiers.take_items(Tier::LongTermMemory), rag_budget);
            if !outcome.dropped.is_empty() {
                events.push(DriftEvent::dropped(
                    run_id,
                    Tier::LongTermMemory,
                    &outcome.dropped,
                    format!(
                        "Dropped {} of {} documents to fit the RAG budget of {} tokens",
                        outcome.dropped.len(),
                        outcome.dropped.len() + outcome.kept.len(),
                        rag_budget
                    ),
                ));
            }
            tiers.set_items(Tier::LongTermMemory, outcome.kept);
        }

        // ── Tier 2: conversation history against what is left ──────────────
        if tiers.total_tokens() > total_limit {
            let history = tiers.take_items(Tier::WorkingSet);
            let others = tiers.total_tokens();
            let history_budget = total_limit.saturating_sub(others);
            let outcome = if history_budget == 0 {
                let mut dropped = history;
                dropped.sort_by_key(|item| item.timestamp);
                PruneOutcome { kept: Vec::new(), dropped }
            } else {
                prune_oldest_first(history, history_budget)
            };

            if !outcome.dropped.is_empty() {
                events.push(DriftEvent::dropped(
                    run_id,
                    Tier::WorkingSet,
                    &outcome.dropped,
                    format!(
                        "Dropped {} oldest conversation turns to fit {} remaining tokens",
                        outcome.dropped.len(),
                        history_budget
                    ),
                ));

                let summary = self.summarizer.summarize(&outcome.dropped).await;
                if !summary.trim().is_empty() {
                    let item = self.summary_item(&tiers, &summary, run_id, now);
                    events.push(DriftEvent::new(
                        run_id,
                        DriftKind::Summarize,
                        Tier::CondensedHistory,
                        outcome.dropped.iter().map(|i| i.id.clone()).collect(),
                        item.tokens,
                        format!("Summarized {} dropped turns into {}", outcome.dropped.len(), item.id),
                    ));
                    tiers.add_item(item);
                }
            }
            tiers.set_items(Tier::WorkingSet, outcome.kept);
        }

        self.drift.record_all(&events);

        let context = render(&tiers, has_active_task);
        let total_tokens = tiers.total_tokens();
        let report = AssemblyReport {
            run_id,
            total_tokens,
            budget: total_limit,
            rag_budget,
            utilization_pct: (total_tokens as f32 / total_limit as f32) * 100.0,
            over_budget: total_tokens > total_limit,
            protected_overflow,
            duplicates_removed,
            tiers: Tier::ALL
                .iter()
                .map(|&tier| TierStats {
                    tier,
                    tokens: tiers.tier_usage(tier),
                    items_included: tiers.items(tier).len(),
                    items_total: items_total[tier.ordinal()],
                })
                .collect(),
            allocations: self.budget.allocations(total_limit),
            drift_events: events,
        };

        info!(
            run_id = %run_id,
            tokens = total_tokens,
            budget = total_limit,
            drift_events = report.drift_events.len(),
            "Context assembled"
        );

        AssembledContext { context, report }
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Fill the tiers from a request. Returns the number of duplicate
    /// documents skipped.
    fn populate(&self, tiers: &mut TierManager, request: AssemblyRequest, now: i64) -> usize {
        let AssemblyRequest {
            system_instructions,
            active_task,
            history,
            summaries,
            documents,
        } = request;

        tiers.add_item(self.item("system-instructions", Tier::Immutable, ItemType::System, system_instructions, now));

        if let Some(task) = active_task {
            tiers.add_item(self.item("active-task", Tier::ActiveTask, ItemType::Other("task".into()), task, now));
        }

        let turns = history.len() as i64;
        for (index, turn) in history.into_iter().enumerate() {
            let timestamp = turn
                .timestamp
                .unwrap_or(now - (turns - index as i64) * TURN_SPACING_MS);
            let id = turn.id.clone().unwrap_or_else(|| format!("msg-{index}"));
            tiers.add_item(self.item(id, Tier::WorkingSet, ItemType::ChatMessage, turn.rendered(), timestamp));
        }

        let count = summaries.len() as i64;
        for (index, summary) in summaries.into_iter().enumerate() {
            let timestamp = now - (count - index as i64);
            tiers.add_item(self.item(
                format!("summary-{index}"),
                Tier::CondensedHistory,
                ItemType::Summary,
                summary,
                timestamp,
            ));
        }

        let mut seen_ids = HashSet::new();
        let mut seen_hashes = HashSet::new();
        let mut duplicates = 0;
        for doc in documents {
            let hash = doc.content_hash();
            let id = doc.metadata.id.clone().filter(|id| !id.is_empty());
            let duplicate_id = id.as_ref().is_some_and(|id| seen_ids.contains(id));
            if duplicate_id || seen_hashes.contains(&hash) {
                debug!(id = ?id, "Skipping duplicate document");
                duplicates += 1;
                continue;
            }
            if let Some(id) = &id {
                seen_ids.insert(id.clone());
            }

            let item_id = format!("doc-{}", id.as_deref().unwrap_or(&hash[..12]));
            let content = match doc.header() {
                Some(header) => format!("{header}\n{}", doc.page_content),
                None => doc.page_content.clone(),
            };
            let score = doc.metadata.relevance_score().unwrap_or(0.0);
            let mut item = self
                .item(item_id, Tier::LongTermMemory, ItemType::Document, content, now)
                .with_score(score);
            if let Some(source) = doc.metadata.source.clone().or_else(|| doc.metadata.url.clone()) {
                item = item.with_source_id(source);
            }
            seen_hashes.insert(hash);
            tiers.add_item(item);
        }
        duplicates
    }

    fn item(&self, id: impl Into<String>, tier: Tier, item_type: ItemType, content: String, timestamp: i64) -> ContextItem {
        let tokens = self.counter.count_tokens(&content);
        ContextItem::new(id, tier, item_type, content, tokens, timestamp)
    }

    /// Tier 3 item wrapping a fresh summary, ordered after every existing
    /// summary.
    fn summary_item(&self, tiers: &TierManager, summary: &str, run_id: Uuid, now: i64) -> ContextItem {
        let latest = tiers
            .items(Tier::CondensedHistory)
            .iter()
            .map(|item| item.timestamp)
            .max();
        let timestamp = latest.map_or(now, |latest| now.max(latest + 1));

        let item = self.item(
            format!("summary-{run_id}"),
            Tier::CondensedHistory,
            ItemType::Summary,
            format!("{SUMMARY_PREFIX} {}", summary.trim()),
            timestamp,
        );

        let usage = tiers.tier_usage(Tier::CondensedHistory);
        if !self.budget.can_fit(Tier::CondensedHistory, item.tokens, usage) {
            debug!(
                tokens = item.tokens,
                usage,
                limit = self.budget.tier_limit(Tier::CondensedHistory),
                "Summary exceeds the condensed history limit"
            );
        }
        item
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────

fn render(tiers: &TierManager, include_active_task: bool) -> String {
    let by_time = |tier: Tier| {
        let mut items: Vec<&ContextItem> = tiers.items(tier).iter().collect();
        items.sort_by_key(|item| item.timestamp);
        items
    };

    let mut sections: Vec<&ContextItem> = tiers.items(Tier::Immutable).iter().collect();
    sections.extend(by_time(Tier::CondensedHistory));
    sections.extend(tiers.items(Tier::LongTermMemory));
    sections.extend(by_time(Tier::WorkingSet));
    if include_active_task {
        sections.extend(tiers.items(Tier::ActiveTask));
    }

    sections
        .into_iter()
        .map(|item| item.content.as_str())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}
