//! Dossier - staged due diligence pipeline over a subject company
//!
//! A run fans a layer of research agents out in parallel, gates on how
//! much of it came back, optionally retries, then runs analysis and
//! synthesis layers over the accumulated findings. Individual task
//! failures never abort a stage; they settle as recorded failures and
//! the completeness gate decides what happens next.

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod provider;
pub mod runtime;
pub mod samples;
pub mod state;
pub mod tools;

pub use agent::{AgentLayer, AgentRegistry, AgentSpec};
pub use config::PipelineConfig;
pub use error::{DossierError, FixSuggestion};
pub use event::{Event, EventKind, EventLog};
pub use provider::{create_provider, PromptRequest, PromptResponse, Provider};
pub use runtime::WorkflowEngine;
pub use state::{RunState, Stage, StageOutcome, TaskResult};
