//! Research completeness gate.
//!
//! After validation the engine asks one question: are the accumulated
//! research results good enough to analyze? The evaluator answers with a
//! [`StageOutcome`] and the engine maps that onto the transition table.

use crate::state::{StageOutcome, TaskResult};

/// Classifies accumulated stage results against a success-ratio threshold
/// and a bounded retry budget.
///
/// With no successful results at all there is nothing to analyze: the stage
/// retries while budget remains and fails once it runs out. With at least
/// one success, a ratio at or above the threshold proceeds; below it, the
/// stage retries while budget remains and is otherwise accepted as-is
/// (degraded completion).
#[derive(Debug, Clone, Copy)]
pub struct CompletenessEvaluator {
    min_success_ratio: f64,
    max_retries: u32,
}

impl CompletenessEvaluator {
    pub fn new(min_success_ratio: f64, max_retries: u32) -> Self {
        Self {
            min_success_ratio,
            max_retries,
        }
    }

    /// Verdict over accumulated success counts.
    pub fn evaluate(&self, successes: usize, total: usize, retry_count: u32) -> StageOutcome {
        if successes == 0 {
            return if retry_count < self.max_retries {
                StageOutcome::Incomplete
            } else {
                StageOutcome::Failed
            };
        }

        let ratio = successes as f64 / total as f64;
        if ratio >= self.min_success_ratio {
            StageOutcome::Complete
        } else if retry_count < self.max_retries {
            StageOutcome::Incomplete
        } else {
            StageOutcome::Complete
        }
    }

    /// Verdict over a result list; counts and delegates.
    pub fn evaluate_results(&self, results: &[TaskResult], retry_count: u32) -> StageOutcome {
        let successes = results.iter().filter(|r| r.success).count();
        self.evaluate(successes, results.len(), retry_count)
    }

    /// Whether accepting these counts means degraded completion: some
    /// successes exist but the ratio is still below the threshold.
    pub fn is_degraded(&self, successes: usize, total: usize) -> bool {
        successes > 0 && (successes as f64 / total as f64) < self.min_success_ratio
    }
}
