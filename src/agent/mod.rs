//! Agent catalog and prompt construction.

pub mod prompts;
mod registry;

pub use registry::{AgentLayer, AgentRegistry, AgentSpec};
