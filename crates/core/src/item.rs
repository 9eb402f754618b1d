//! Context items and the priority tiers they live in.
//!
//! Every piece of text that may end up in an assembled prompt is wrapped in
//! a [`ContextItem`] and placed in exactly one [`Tier`]. Tiers are ordered
//! by how strongly an item is protected from pruning:
//!
//! | Tier | Contents | Pruning |
//! |------|----------|---------|
//! | 0 `Immutable` | System instructions | Never |
//! | 1 `ActiveTask` | Current task state | Never |
//! | 2 `WorkingSet` | Recent conversation | Oldest first, summarized |
//! | 3 `CondensedHistory` | Summaries of dropped turns | Kept in order |
//! | 4 `LongTermMemory` | Retrieved documents | Lowest score first |

use serde::{Deserialize, Serialize};
use std::fmt;

/// A priority bucket for context items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Immutable,
    ActiveTask,
    WorkingSet,
    CondensedHistory,
    LongTermMemory,
}

impl Tier {
    /// All tiers in ascending ordinal order.
    pub const ALL: [Tier; 5] = [
        Tier::Immutable,
        Tier::ActiveTask,
        Tier::WorkingSet,
        Tier::CondensedHistory,
        Tier::LongTermMemory,
    ];

    /// Zero-based ordinal (0 = immutable, 4 = long-term memory).
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Tiers 0 and 1 must always fit and are never pruned.
    pub fn is_protected(self) -> bool {
        matches!(self, Tier::Immutable | Tier::ActiveTask)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Immutable => "immutable",
            Tier::ActiveTask => "active_task",
            Tier::WorkingSet => "working_set",
            Tier::CondensedHistory => "condensed_history",
            Tier::LongTermMemory => "long_term_memory",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of content an item carries. Used for labels and summary
/// prompts only; pruning never looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    System,
    ToolResult,
    Document,
    Summary,
    ChatMessage,
    Other(String),
}

impl ItemType {
    /// Upper-case tag used in summary prompts, e.g. `CHAT_MESSAGE`.
    pub fn tag(&self) -> String {
        match self {
            ItemType::System => "SYSTEM".into(),
            ItemType::ToolResult => "TOOL_RESULT".into(),
            ItemType::Document => "DOCUMENT".into(),
            ItemType::Summary => "SUMMARY".into(),
            ItemType::ChatMessage => "CHAT_MESSAGE".into(),
            ItemType::Other(kind) => kind.to_uppercase(),
        }
    }
}

/// A unit of context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Stable identifier, unique within one tier population.
    pub id: String,

    /// The tier this item belongs to.
    pub tier: Tier,

    /// Text payload.
    pub content: String,

    /// Label used for summaries.
    pub item_type: ItemType,

    /// Precomputed token count of `content`.
    pub tokens: usize,

    /// Logical recency in epoch milliseconds.
    pub timestamp: i64,

    /// Relevance carried over from retrieval. Absent scores count as 0.
    #[serde(default)]
    pub score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Opaque pass-through data.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ContextItem {
    pub fn new(
        id: impl Into<String>,
        tier: Tier,
        item_type: ItemType,
        content: impl Into<String>,
        tokens: usize,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            tier,
            content: content.into(),
            item_type,
            tokens,
            timestamp,
            score: 0.0,
            source_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = if score.is_finite() { score } else { 0.0 };
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}
