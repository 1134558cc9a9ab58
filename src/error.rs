//! Dossier Error Types with Error Codes
//!
//! Error code ranges:
//! - DOSS-000-009: Agent registry errors
//! - DOSS-010-019: Configuration errors
//! - DOSS-020-029: Provider errors
//! - DOSS-030-039: IO/serialization errors
//!
//! Task-level failures (timeouts, provider errors, bad output) are NOT
//! represented here: they are recorded as failed `TaskResult`s so one task
//! can never abort its siblings. This enum covers the errors that stop a
//! run before it starts.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DossierError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum DossierError {
    // ═══════════════════════════════════════════
    // AGENT REGISTRY ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[DOSS-001] Unknown agent '{name}'. Available agents: {available}")]
    UnknownAgent { name: String, available: String },

    #[error("[DOSS-002] Duplicate agent id '{name}' in registry")]
    DuplicateAgent { name: String },

    #[error("[DOSS-003] Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[DOSS-010] Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("[DOSS-011] Unknown sample subject '{name}'")]
    UnknownSample { name: String },

    // ═══════════════════════════════════════════
    // PROVIDER ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[DOSS-020] Unknown provider: '{name}'. Available: {available}")]
    UnknownProvider { name: String, available: String },

    // ═══════════════════════════════════════════
    // IO / SERIALIZATION ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[DOSS-030] IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[DOSS-031] JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DossierError {
    /// Get the error code (e.g., "DOSS-001")
    pub fn code(&self) -> &'static str {
        match self {
            // Registry errors
            Self::UnknownAgent { .. } => "DOSS-001",
            Self::DuplicateAgent { .. } => "DOSS-002",
            Self::UnknownTool { .. } => "DOSS-003",
            // Configuration errors
            Self::InvalidConfig { .. } => "DOSS-010",
            Self::UnknownSample { .. } => "DOSS-011",
            // Provider errors
            Self::UnknownProvider { .. } => "DOSS-020",
            // IO/serialization errors
            Self::IoError(_) => "DOSS-030",
            Self::JsonError(_) => "DOSS-031",
        }
    }

    /// Check if error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoError(_))
    }
}

impl FixSuggestion for DossierError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DossierError::UnknownAgent { .. } => {
                Some("Run 'dossier agents' to list the registered agents")
            }
            DossierError::DuplicateAgent { .. } => Some("Agent ids must be unique"),
            DossierError::UnknownTool { .. } => {
                Some("Agents may only reference the built-in web tools")
            }
            DossierError::InvalidConfig { .. } => {
                Some("Check threshold, retry and timeout values")
            }
            DossierError::UnknownSample { .. } => {
                Some("Run 'dossier samples' to list built-in subjects")
            }
            DossierError::UnknownProvider { .. } => {
                Some("Use --provider ollama (default) or --provider mock")
            }
            DossierError::IoError(_) => Some("Check file path and permissions"),
            DossierError::JsonError(_) => Some("Check JSON syntax"),
        }
    }
}
