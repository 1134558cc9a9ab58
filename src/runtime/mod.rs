//! Runtime Module - Pipeline execution (v0.1)
//!
//! Contains the moving parts of a run:
//! - `engine`: stage loop, routing and state merging
//! - `stage`: batched fan-out over concurrent tasks
//! - `task`: one prompt call with timeout and events
//! - `routing`: the research completeness gate
//! - `output`: structured-output extraction from model replies
//!
//! This module represents the "how" - runtime execution.
//! For the agent catalog and prompts, see the `agent` module.

mod engine;
mod output;
mod routing;
mod stage;
mod task;

// Re-export public types
pub use engine::WorkflowEngine;
pub use output::parse_structured_output;
pub use routing::CompletenessEvaluator;
pub use stage::{StageExecutor, StageResult, TaskPlan};
pub use task::TaskRunner;
