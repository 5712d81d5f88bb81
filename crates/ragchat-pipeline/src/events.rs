//! Per-stage observability events.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieval,
    Assembly,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Retrieval => "retrieval",
            Stage::Assembly => "assembly",
            Stage::Generation => "generation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: Stage,
    pub latency_ms: u64,
    /// `ok` or the error kind, e.g. `generation_error`.
    pub status: String,
    /// Passages retrieved, passages kept, or answer length, depending on stage.
    pub items: usize,
}

/// Receives stage events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &StageEvent);
}

/// Logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &StageEvent) {
        if event.status == "ok" {
            tracing::info!(stage = %event.stage, latency_ms = event.latency_ms, items = event.items, "stage complete");
        } else {
            tracing::warn!(stage = %event.stage, latency_ms = event.latency_ms, status = %event.status, "stage failed");
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &StageEvent) {}
}
