//! Domain model for a pipeline run.
//!
//! - [`Stage`] / [`StageOutcome`]: checkpoint enum and the transition table
//! - [`TaskResult`]: uniform result surface for every task attempt
//! - [`RunState`] / [`StateDelta`]: append-only accumulator, engine-merged

mod run_state;
mod stage;
mod task;

pub use run_state::{RunState, StateDelta};
pub use stage::{Stage, StageOutcome};
pub use task::TaskResult;
