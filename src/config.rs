//! Pipeline configuration
//!
//! Thresholds, retry budget, per-layer task timeouts and provider/model
//! selection. Defaults mirror the production pipeline: research must clear
//! a 0.5 success ratio, with up to 2 re-runs before the run is abandoned.
//!
//! Precedence: defaults < environment (`DOSSIER_*`) < CLI flags.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentLayer;
use crate::error::{DossierError, Result};

/// Model aliases resolved to the configured concrete model id.
pub const MODEL_ALIASES: &[&str] = &["haiku", "sonnet", "opus"];

/// Runtime knobs for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Minimum fraction of research tasks that must succeed for the
    /// research stage to validate.
    pub min_success_ratio: f64,
    /// Research re-runs allowed before the gate stops retrying.
    pub max_retries: u32,
    /// Per-task timeout for research agents, in seconds.
    pub research_timeout_secs: u64,
    /// Per-task timeout for analysis agents, in seconds.
    pub analysis_timeout_secs: u64,
    /// Per-task timeout for synthesis agents, in seconds.
    pub synthesis_timeout_secs: u64,
    /// Provider name passed to `create_provider`.
    pub provider: String,
    /// Concrete model id behind the haiku/sonnet/opus aliases.
    pub model: String,
    /// Finish degraded runs at PARTIAL instead of COMPLETE. A run is
    /// degraded when research validated only because the retry budget
    /// ran out, not because it cleared the ratio.
    pub partial_on_degraded: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_success_ratio: 0.5,
            max_retries: 2,
            research_timeout_secs: 90,
            analysis_timeout_secs: 120,
            synthesis_timeout_secs: 180,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            partial_on_degraded: false,
        }
    }
}

impl PipelineConfig {
    /// Merge environment variables on top of the current values.
    /// Empty or unparseable values do not override.
    pub fn with_env(mut self) -> Self {
        if let Ok(provider) = env::var("DOSSIER_PROVIDER") {
            if !provider.is_empty() {
                self.provider = provider;
            }
        }
        if let Ok(model) = env::var("DOSSIER_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }
        if let Ok(raw) = env::var("DOSSIER_MIN_SUCCESS_RATIO") {
            if let Ok(ratio) = raw.parse::<f64>() {
                self.min_success_ratio = ratio;
            }
        }
        if let Ok(raw) = env::var("DOSSIER_MAX_RETRIES") {
            if let Ok(retries) = raw.parse::<u32>() {
                self.max_retries = retries;
            }
        }
        self
    }

    /// Reject out-of-range values before a run starts.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_success_ratio) {
            return Err(DossierError::InvalidConfig {
                message: format!(
                    "min_success_ratio must be within 0.0..=1.0, got {}",
                    self.min_success_ratio
                ),
            });
        }
        if self.research_timeout_secs == 0
            || self.analysis_timeout_secs == 0
            || self.synthesis_timeout_secs == 0
        {
            return Err(DossierError::InvalidConfig {
                message: "task timeouts must be nonzero".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(DossierError::InvalidConfig {
                message: "model must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve a model alias to a concrete model id.
    /// Unrecognized names pass through unchanged so explicit model ids
    /// keep working.
    pub fn resolve_model(&self, alias: &str) -> String {
        if MODEL_ALIASES.contains(&alias) {
            self.model.clone()
        } else {
            alias.to_string()
        }
    }

    /// Task timeout for an agent layer.
    pub fn timeout_for(&self, layer: AgentLayer) -> Duration {
        let secs = match layer {
            AgentLayer::Research => self.research_timeout_secs,
            AgentLayer::Analysis => self.analysis_timeout_secs,
            AgentLayer::Synthesis => self.synthesis_timeout_secs,
        };
        Duration::from_secs(secs)
    }
}
