//! Uniform task result surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single task attempt.
///
/// The constructors keep the field pairing honest: a success never carries
/// an error, a failure never carries structured output. Every failure mode
/// (provider error, declared failure, timeout, panic) ends up here instead
/// of propagating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    /// Structured output parsed from the raw reply, when parseable.
    pub output: Option<Value>,
    /// Verbatim reply text. Kept on success even when parsing fails.
    pub raw_text: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

impl TaskResult {
    pub fn success(
        task_id: impl Into<String>,
        output: Option<Value>,
        raw_text: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output,
            raw_text: Some(raw_text.into()),
            error: None,
            execution_time_ms,
        }
    }

    pub fn failure(
        task_id: impl Into<String>,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: None,
            raw_text: None,
            error: Some(error.into()),
            execution_time_ms,
        }
    }

    /// `"{task_id}: {error}"` line for the run's error list.
    /// None for successful results.
    pub fn error_line(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|error| format!("{}: {}", self.task_id, error))
    }
}
