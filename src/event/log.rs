//! Append-only audit trail of one pipeline run.
//!
//! Every emit is recorded with a monotonic sequence id and a timestamp
//! relative to run start, so an exported log replays the run's shape
//! without any wall-clock coupling. The log is a cheap-to-clone handle;
//! the engine and every spawned task write through the same one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded event: sequence id, relative timestamp, payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number, unique within a run.
    pub id: u64,
    /// Milliseconds since the log was created.
    pub timestamp_ms: u64,
    /// What happened.
    pub kind: EventKind,
}

/// Pipeline, stage and task level events.
///
/// Task ids are `Arc<str>` so task-level events clone without copying
/// the id string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PIPELINE LEVEL
    // ═══════════════════════════════════════════
    PipelineStarted {
        subject: String,
        agent_count: usize,
    },
    PipelineCompleted {
        final_stage: String,
        total_duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // STAGE LEVEL
    // ═══════════════════════════════════════════
    /// A stage's batches all settled and its delta was merged.
    StageSettled {
        stage: String,
        successes: usize,
        total: usize,
    },
    /// Verdict of the research completeness gate.
    ResearchEvaluated {
        retry_count: u32,
        successes: usize,
        total: usize,
        outcome: String,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskStarted {
        task_id: Arc<str>,
    },
    TaskCompleted {
        task_id: Arc<str>,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },
}

impl EventKind {
    /// The task this event belongs to, for task-level events.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. } => Some(task_id),
            Self::PipelineStarted { .. }
            | Self::PipelineCompleted { .. }
            | Self::StageSettled { .. }
            | Self::ResearchEvaluated { .. } => None,
        }
    }

    pub fn is_pipeline_event(&self) -> bool {
        matches!(
            self,
            Self::PipelineStarted { .. } | Self::PipelineCompleted { .. }
        )
    }
}

/// Shared handle to the run's event list. Clones write to the same log.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    /// An empty log; timestamps are measured from this moment.
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append an event and return its sequence id.
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Snapshot of every event so far, in emit order.
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Read the events in place without cloning them.
    ///
    /// The read lock is held for the duration of `f`; keep it short.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    /// Every event recorded for one task.
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.task_id() == Some(task_id))
                .cloned()
                .collect()
        })
    }

    /// Pipeline-level events only.
    pub fn pipeline_events(&self) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.is_pipeline_event())
                .cloned()
                .collect()
        })
    }

    /// How many events one task recorded, without allocating.
    pub fn count_task(&self, task_id: &str) -> usize {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.task_id() == Some(task_id))
                .count()
        })
    }

    /// The whole log as one JSON array.
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    /// One event per line, for the CLI `--events` export.
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        self.with_events(|events| {
            let mut out = String::new();
            for event in events {
                out.push_str(&serde_json::to_string(event)?);
                out.push('\n');
            }
            Ok(out)
        })
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
