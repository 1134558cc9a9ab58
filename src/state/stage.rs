//! Pipeline stages and the routing transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Checkpoints a run moves through. The names record what has settled,
/// not what runs next. `Complete`, `Partial` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    InitComplete,
    ResearchComplete,
    ResearchValidated,
    AnalysisComplete,
    SynthesisComplete,
    Complete,
    Partial,
    Failed,
}

/// Completeness verdict for the work owned by a stage. Produced by the
/// input check at INIT and by the completeness evaluator at the research
/// gate; every other stage settles with `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Complete,
    Incomplete,
    Failed,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Complete => "complete",
            StageOutcome::Incomplete => "incomplete",
            StageOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::InitComplete => "init_complete",
            Stage::ResearchComplete => "research_complete",
            Stage::ResearchValidated => "research_validated",
            Stage::AnalysisComplete => "analysis_complete",
            Stage::SynthesisComplete => "synthesis_complete",
            Stage::Complete => "complete",
            Stage::Partial => "partial",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Partial | Stage::Failed)
    }

    /// Transition table: the stage entered when the work owned by the
    /// current stage settles with `outcome`.
    ///
    /// `Incomplete` only routes somewhere new at the research gate, where
    /// it re-enters the research fan-out. The rest of the pipeline is
    /// linear, and a `Failed` verdict aborts the run from anywhere.
    pub fn next(self, outcome: StageOutcome) -> Stage {
        use StageOutcome::*;
        match (self, outcome) {
            // Terminal stages absorb every outcome.
            (Stage::Complete, _) => Stage::Complete,
            (Stage::Partial, _) => Stage::Partial,
            (Stage::Failed, _) => Stage::Failed,
            // Missing inputs cannot improve by retrying.
            (Stage::Init, Complete) => Stage::InitComplete,
            (Stage::Init, Incomplete) | (Stage::Init, Failed) => Stage::Failed,
            // Research fan-out always lands in validation.
            (Stage::InitComplete, Failed) => Stage::Failed,
            (Stage::InitComplete, _) => Stage::ResearchComplete,
            (Stage::ResearchComplete, Failed) => Stage::Failed,
            (Stage::ResearchComplete, _) => Stage::ResearchValidated,
            // The retry gate.
            (Stage::ResearchValidated, Complete) => Stage::AnalysisComplete,
            (Stage::ResearchValidated, Incomplete) => Stage::InitComplete,
            (Stage::ResearchValidated, Failed) => Stage::Failed,
            // Linear tail.
            (Stage::AnalysisComplete, Failed) => Stage::Failed,
            (Stage::AnalysisComplete, _) => Stage::SynthesisComplete,
            (Stage::SynthesisComplete, Failed) => Stage::Failed,
            (Stage::SynthesisComplete, _) => Stage::Complete,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STAGES: [Stage; 9] = [
        Stage::Init,
        Stage::InitComplete,
        Stage::ResearchComplete,
        Stage::ResearchValidated,
        Stage::AnalysisComplete,
        Stage::SynthesisComplete,
        Stage::Complete,
        Stage::Partial,
        Stage::Failed,
    ];

    const ALL_OUTCOMES: [StageOutcome; 3] = [
        StageOutcome::Complete,
        StageOutcome::Incomplete,
        StageOutcome::Failed,
    ];

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Complete.is_terminal());
        assert!(Stage::Partial.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Init.is_terminal());
        assert!(!Stage::ResearchValidated.is_terminal());
    }

    #[test]
    fn test_happy_path_walk() {
        let mut stage = Stage::Init;
        let expected = [
            Stage::InitComplete,
            Stage::ResearchComplete,
            Stage::ResearchValidated,
            Stage::AnalysisComplete,
            Stage::SynthesisComplete,
            Stage::Complete,
        ];
        for want in expected {
            stage = stage.next(StageOutcome::Complete);
            assert_eq!(stage, want);
        }
        assert!(stage.is_terminal());
    }

    #[test]
    fn test_retry_gate_reenters_research() {
        let stage = Stage::ResearchValidated.next(StageOutcome::Incomplete);
        assert_eq!(stage, Stage::InitComplete);
        // And the re-run lands back in validation.
        assert_eq!(
            stage.next(StageOutcome::Complete),
            Stage::ResearchComplete
        );
    }

    #[test]
    fn test_init_failure_routes_to_failed() {
        assert_eq!(Stage::Init.next(StageOutcome::Failed), Stage::Failed);
        assert_eq!(Stage::Init.next(StageOutcome::Incomplete), Stage::Failed);
    }

    #[test]
    fn test_failed_verdict_aborts_from_any_stage() {
        for stage in ALL_STAGES {
            if stage.is_terminal() {
                continue;
            }
            assert_eq!(stage.next(StageOutcome::Failed), Stage::Failed);
        }
    }

    #[test]
    fn test_terminal_stages_absorb_every_outcome() {
        for stage in [Stage::Complete, Stage::Partial, Stage::Failed] {
            for outcome in ALL_OUTCOMES {
                assert_eq!(stage.next(outcome), stage);
            }
        }
    }

    #[test]
    fn test_every_transition_is_defined() {
        // Walking the full table must never panic and must always make
        // progress toward a terminal stage within the stage count.
        for stage in ALL_STAGES {
            for outcome in ALL_OUTCOMES {
                let mut current = stage.next(outcome);
                for _ in 0..ALL_STAGES.len() {
                    if current.is_terminal() {
                        break;
                    }
                    current = current.next(StageOutcome::Complete);
                }
                assert!(current.is_terminal());
            }
        }
    }

    #[test]
    fn test_serde_snake_case_strings() {
        let json = serde_json::to_string(&Stage::ResearchValidated).unwrap();
        assert_eq!(json, "\"research_validated\"");
        let back: Stage = serde_json::from_str("\"init_complete\"").unwrap();
        assert_eq!(back, Stage::InitComplete);
    }

    #[test]
    fn test_as_str_matches_serde() {
        for stage in ALL_STAGES {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
