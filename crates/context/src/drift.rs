//! Drift monitor: append-only record of what pruning took away.
//!
//! Every item dropped from a tier and every summary written in its place
//! becomes a [`DriftEvent`]. Events are kept in memory and forwarded to
//! pluggable sinks.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{ContextItem, Tier};
use uuid::Uuid;

/// What happened to the affected items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Items removed to satisfy a budget.
    Drop,
    /// Dropped items condensed into a summary.
    Summarize,
}

/// A single drift record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    pub timestamp: DateTime<Utc>,
    /// Assembly run that produced this event.
    pub run_id: Uuid,
    pub kind: DriftKind,
    pub tier: Tier,
    pub item_ids: Vec<String>,
    /// Tokens removed (drop) or written (summarize).
    pub tokens: usize,
    pub description: String,
}

impl DriftEvent {
    pub fn new(
        run_id: Uuid,
        kind: DriftKind,
        tier: Tier,
        item_ids: Vec<String>,
        tokens: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            kind,
            tier,
            item_ids,
            tokens,
            description: description.into(),
        }
    }

    /// A drop event covering `items`.
    pub fn dropped(run_id: Uuid, tier: Tier, items: &[ContextItem], description: impl Into<String>) -> Self {
        Self::new(
            run_id,
            DriftKind::Drop,
            tier,
            items.iter().map(|item| item.id.clone()).collect(),
            items.iter().map(|item| item.tokens).sum(),
            description,
        )
    }
}

/// Where drift events are written besides the in-memory log.
pub trait DriftSink: Send + Sync {
    fn record(&self, event: &DriftEvent);
}

/// Shared, thread-safe drift log.
pub struct DriftMonitor {
    events: Mutex<Vec<DriftEvent>>,
    sinks: Vec<Box<dyn DriftSink>>,
}

impl std::fmt::Debug for DriftMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftMonitor")
            .field("event_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DriftMonitor {
    /// Create a monitor with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn DriftSink>>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            sinks,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DriftEvent>> {
        // A panic mid-push cannot leave the Vec half-written.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, event: DriftEvent) {
        for sink in &self.sinks {
            sink.record(&event);
        }
        self.lock().push(event);
    }

    /// Record a batch under one lock acquisition.
    pub fn record_all(&self, events: &[DriftEvent]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            for sink in &self.sinks {
                sink.record(event);
            }
        }
        self.lock().extend_from_slice(events);
    }

    pub fn events(&self) -> Vec<DriftEvent> {
        self.lock().clone()
    }

    pub fn events_for_run(&self, run_id: Uuid) -> Vec<DriftEvent> {
        self.lock()
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn events_by_kind(&self, kind: DriftKind) -> Vec<DriftEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Logs each drift event through `tracing::info!`.
pub struct TracingSink;

impl DriftSink for TracingSink {
    fn record(&self, event: &DriftEvent) {
        tracing::info!(
            kind = ?event.kind,
            tier = %event.tier,
            items = event.item_ids.len(),
            tokens = event.tokens,
            run_id = %event.run_id,
            "DRIFT {}",
            event.description
        );
    }
}
