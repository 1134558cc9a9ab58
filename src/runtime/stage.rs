//! Stage execution: sequential batches of concurrent tasks.
//!
//! A stage is a list of batches. Batches run one after another; every task
//! inside a batch runs concurrently and the batch settles only once all of
//! them have. One task failing, timing out or panicking never aborts its
//! siblings. Results always come back in declaration order, not completion
//! order.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::provider::PromptRequest;
use crate::runtime::task::TaskRunner;
use crate::state::TaskResult;

/// One planned task: an id, a timeout, and a request builder that may read
/// the results of the stage's earlier batches.
pub struct TaskPlan {
    pub task_id: String,
    pub timeout: Duration,
    builder: Box<dyn FnOnce(&StageResult) -> PromptRequest + Send>,
}

impl TaskPlan {
    /// Plan with a fixed request, independent of earlier batches.
    pub fn new(task_id: impl Into<String>, timeout: Duration, request: PromptRequest) -> Self {
        Self::with_builder(task_id, timeout, move |_| request)
    }

    /// Plan whose request is built from whatever the stage has settled so
    /// far. The builder runs right before the task's batch starts.
    pub fn with_builder(
        task_id: impl Into<String>,
        timeout: Duration,
        builder: impl FnOnce(&StageResult) -> PromptRequest + Send + 'static,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            timeout,
            builder: Box::new(builder),
        }
    }
}

impl fmt::Debug for TaskPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPlan")
            .field("task_id", &self.task_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settled results of a stage, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StageResult {
    pub task_results: Vec<TaskResult>,
}

impl StageResult {
    pub fn success_count(&self) -> usize {
        self.task_results.iter().filter(|r| r.success).count()
    }

    pub fn total(&self) -> usize {
        self.task_results.len()
    }

    /// Fraction of tasks that succeeded; 0.0 for an empty stage.
    pub fn success_ratio(&self) -> f64 {
        if self.task_results.is_empty() {
            return 0.0;
        }
        self.success_count() as f64 / self.task_results.len() as f64
    }

    pub fn all_succeeded(&self) -> bool {
        self.task_results.iter().all(|r| r.success)
    }

    /// Structured output of a successful task, by id.
    pub fn output_of(&self, task_id: &str) -> Option<&Value> {
        self.task_results
            .iter()
            .find(|r| r.task_id == task_id && r.success)
            .and_then(|r| r.output.as_ref())
    }

    /// Raw reply text of a successful task, by id.
    pub fn raw_text_of(&self, task_id: &str) -> Option<&str> {
        self.task_results
            .iter()
            .find(|r| r.task_id == task_id && r.success)
            .and_then(|r| r.raw_text.as_deref())
    }

    /// One `"{task_id}: {error}"` line per failed task.
    pub fn error_lines(&self) -> Vec<String> {
        self.task_results
            .iter()
            .filter_map(|r| r.error_line())
            .collect()
    }
}

/// Fans task plans out over the runner, batch by batch.
#[derive(Debug, Clone)]
pub struct StageExecutor {
    runner: TaskRunner,
}

impl StageExecutor {
    pub fn new(runner: TaskRunner) -> Self {
        Self { runner }
    }

    /// Run the stage's batches in order. Each batch sees the accumulated
    /// results of the batches before it.
    pub async fn run_stage(&self, batches: Vec<Vec<TaskPlan>>) -> StageResult {
        let mut stage = StageResult::default();
        for (index, batch) in batches.into_iter().enumerate() {
            debug!(batch = index, tasks = batch.len(), "running batch");
            let results = self.run_batch(batch, &stage).await;
            stage.task_results.extend(results);
        }
        stage
    }

    /// All tasks are spawned before any is awaited, so the batch runs
    /// concurrently. Awaiting the handles in spawn order keeps results in
    /// declaration order without sorting.
    async fn run_batch(&self, batch: Vec<TaskPlan>, settled: &StageResult) -> Vec<TaskResult> {
        let mut handles = Vec::with_capacity(batch.len());
        for plan in batch {
            let request = (plan.builder)(settled);
            let runner = self.runner.clone();
            let task_id = plan.task_id;
            let timeout = plan.timeout;
            let handle = tokio::spawn({
                let task_id = task_id.clone();
                async move { runner.run(&task_id, request, timeout).await }
            });
            handles.push((task_id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (task_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    // A panicking task settles as a failure like any other.
                    let reason = if join_error.is_panic() {
                        "task panicked"
                    } else {
                        "task was cancelled"
                    };
                    TaskResult::failure(&task_id, reason, 0)
                }
            };
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::provider::{MockProvider, MockReply};
    use serde_json::json;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn executor_with(mock: MockProvider) -> StageExecutor {
        StageExecutor::new(TaskRunner::new(Arc::new(mock), EventLog::new()))
    }

    fn plan(task_id: &str, prompt: &str) -> TaskPlan {
        TaskPlan::new(task_id, TIMEOUT, PromptRequest::new(prompt, "llama3.2"))
    }

    #[tokio::test]
    async fn results_keep_declaration_order_regardless_of_completion_order() {
        let mock = MockProvider::new()
            .with_reply_sequence(
                "alpha",
                vec![MockReply::Slow {
                    delay_ms: 150,
                    content: r#"{"task": "alpha"}"#.into(),
                }],
            )
            .with_response_for("beta", r#"{"task": "beta"}"#);
        let executor = executor_with(mock);

        let stage = executor
            .run_stage(vec![vec![plan("slow_one", "alpha"), plan("fast_one", "beta")]])
            .await;

        let ids: Vec<&str> = stage.task_results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["slow_one", "fast_one"]);
        assert!(stage.all_succeeded());
    }

    #[tokio::test]
    async fn a_panicking_task_does_not_abort_its_siblings() {
        let mock = MockProvider::new()
            .with_response_for("left", r#"{"n": 1}"#)
            .with_reply_sequence("boom", vec![MockReply::Panic])
            .with_response_for("right", r#"{"n": 3}"#);
        let executor = executor_with(mock);

        let stage = executor
            .run_stage(vec![vec![
                plan("left_task", "left"),
                plan("panicky", "boom"),
                plan("right_task", "right"),
            ]])
            .await;

        assert_eq!(stage.total(), 3);
        assert_eq!(stage.success_count(), 2);
        assert!(stage.task_results[0].success);
        assert!(!stage.task_results[1].success);
        assert_eq!(stage.task_results[1].error.as_deref(), Some("task panicked"));
        assert!(stage.task_results[2].success);
    }

    #[tokio::test]
    async fn failures_settle_alongside_successes() {
        let mock = MockProvider::new()
            .with_response_for("good", r#"{"ok": true}"#)
            .with_failure_for("bad", "backend unavailable");
        let executor = executor_with(mock);

        let stage = executor
            .run_stage(vec![vec![plan("good_task", "good"), plan("bad_task", "bad")]])
            .await;

        assert_eq!(stage.total(), 2);
        assert_eq!(stage.success_count(), 1);
        assert_eq!(stage.error_lines(), vec!["bad_task: backend unavailable"]);
    }

    #[tokio::test]
    async fn later_batches_see_earlier_results() {
        let mock = MockProvider::new()
            .with_response_for("produce", r#"{"figure": 42}"#)
            .with_response_for("consume", r#"{"done": true}"#);
        let mock = Arc::new(mock);
        let executor = StageExecutor::new(TaskRunner::new(mock.clone(), EventLog::new()));

        let first = vec![plan("producer", "produce the figure")];
        let second = vec![TaskPlan::with_builder("consumer", TIMEOUT, |prior| {
            let figure = prior
                .output_of("producer")
                .map(|v| v.to_string())
                .unwrap_or_default();
            PromptRequest::new(format!("consume this: {figure}"), "llama3.2")
        })];

        let stage = executor.run_stage(vec![first, second]).await;

        assert!(stage.all_succeeded());
        let recorded = mock.requests();
        assert!(recorded
            .iter()
            .any(|r| r.prompt.contains(r#"{"figure":42}"#)));
    }

    #[tokio::test]
    async fn output_of_ignores_failed_tasks() {
        let mock = MockProvider::new().with_failure_for("broken", "nope");
        let executor = executor_with(mock);

        let stage = executor
            .run_stage(vec![vec![plan("broken_task", "broken")]])
            .await;

        assert_eq!(stage.output_of("broken_task"), None);
        assert_eq!(stage.raw_text_of("broken_task"), None);
    }

    #[tokio::test]
    async fn empty_stage_settles_empty() {
        let mock = MockProvider::new();
        let executor = executor_with(mock);

        let stage = executor.run_stage(vec![]).await;

        assert_eq!(stage.total(), 0);
        assert_eq!(stage.success_ratio(), 0.0);
    }

    #[test]
    fn success_ratio_counts_only_successes() {
        let stage = StageResult {
            task_results: vec![
                TaskResult::success("a", Some(json!({})), "{}", 1),
                TaskResult::failure("b", "x", 1),
                TaskResult::success("c", Some(json!({})), "{}", 1),
                TaskResult::failure("d", "y", 1),
            ],
        };
        assert_eq!(stage.success_count(), 2);
        assert_eq!(stage.success_ratio(), 0.5);
        assert!(!stage.all_succeeded());
    }
}
