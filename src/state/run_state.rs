//! Run state accumulator.
//!
//! The engine is the only writer. Stage work produces a [`StateDelta`] and
//! the engine merges it once the stage has settled, so a half-finished
//! batch can never leak into the state. Output and error lists only ever
//! grow; research outputs from earlier attempts survive a retry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::stage::Stage;
use super::task::TaskResult;

/// Everything accumulated over one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub subject_name: String,
    pub subject_description: String,
    /// Optional category tag (funding stage, sector, ...). Informational.
    pub category: Option<String>,
    research_outputs: Vec<TaskResult>,
    analysis_outputs: Vec<TaskResult>,
    report: Option<String>,
    decision: Option<Value>,
    errors: Vec<String>,
    current_stage: Stage,
    retry_count: u32,
}

impl RunState {
    pub fn new(
        subject_name: impl Into<String>,
        subject_description: impl Into<String>,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            subject_description: subject_description.into(),
            category: None,
            research_outputs: Vec::new(),
            analysis_outputs: Vec::new(),
            report: None,
            decision: None,
            errors: Vec::new(),
            current_stage: Stage::Init,
            retry_count: 0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.current_stage
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Research results accumulated across all attempts.
    pub fn research_outputs(&self) -> &[TaskResult] {
        &self.research_outputs
    }

    pub fn analysis_outputs(&self) -> &[TaskResult] {
        &self.analysis_outputs
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn decision(&self) -> Option<&Value> {
        self.decision.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn research_success_count(&self) -> usize {
        self.research_outputs.iter().filter(|r| r.success).count()
    }

    /// Whether any accumulated error flags a missing required input.
    pub fn has_required_input_error(&self) -> bool {
        self.errors
            .iter()
            .any(|error| error.to_lowercase().contains("required"))
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.current_stage = stage;
    }

    pub(crate) fn increment_retry(&mut self) {
        self.retry_count += 1;
    }

    pub(crate) fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Merge a settled stage's delta. Lists extend, scalars replace only
    /// when the delta provides them.
    pub(crate) fn apply(&mut self, delta: StateDelta) {
        self.research_outputs.extend(delta.research_outputs);
        self.analysis_outputs.extend(delta.analysis_outputs);
        self.errors.extend(delta.errors);
        if delta.report.is_some() {
            self.report = delta.report;
        }
        if delta.decision.is_some() {
            self.decision = delta.decision;
        }
    }
}

/// Changes a settled stage wants merged into the run state.
#[derive(Debug, Default)]
pub struct StateDelta {
    pub research_outputs: Vec<TaskResult>,
    pub analysis_outputs: Vec<TaskResult>,
    pub report: Option<String>,
    pub decision: Option<Value>,
    pub errors: Vec<String>,
}
