//! Single-task execution.
//!
//! `TaskRunner` is the boundary where everything that can go wrong with one
//! task becomes data: transport errors, provider-declared failures and
//! timeouts all settle into a failed [`TaskResult`] instead of propagating.
//! The provider future is dropped when the deadline fires, so a timed-out
//! invocation cannot outlive its slot in the stage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::event::{EventKind, EventLog};
use crate::provider::{PromptRequest, Provider};
use crate::runtime::output::parse_structured_output;
use crate::state::TaskResult;

/// Runs one prompt against a provider and settles the outcome.
///
/// Cheap to clone; the provider and event log are shared handles.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    provider: Arc<dyn Provider>,
    events: EventLog,
}

impl TaskRunner {
    pub fn new(provider: Arc<dyn Provider>, events: EventLog) -> Self {
        Self { provider, events }
    }

    /// Execute a single task attempt to completion.
    ///
    /// Always returns a settled [`TaskResult`]; this method never errors.
    /// A missing structured payload in an otherwise successful reply is not
    /// a failure, the raw text is kept and `output` stays empty.
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn run(&self, task_id: &str, request: PromptRequest, timeout: Duration) -> TaskResult {
        let start = Instant::now();
        self.events.emit(EventKind::TaskStarted {
            task_id: Arc::from(task_id),
        });

        let result = match tokio::time::timeout(timeout, self.provider.execute(request)).await {
            Err(_) => TaskResult::failure(
                task_id,
                format!("Timeout after {}s", timeout.as_secs()),
                elapsed_ms(start),
            ),
            Ok(Err(e)) => TaskResult::failure(task_id, e.to_string(), elapsed_ms(start)),
            Ok(Ok(response)) if !response.success => {
                TaskResult::failure(task_id, response.content, elapsed_ms(start))
            }
            Ok(Ok(response)) => {
                let output = parse_structured_output(&response.content);
                if output.is_none() {
                    debug!(task_id, "reply carried no extractable JSON, keeping raw text");
                }
                TaskResult::success(task_id, output, response.content, elapsed_ms(start))
            }
        };

        match &result.error {
            Some(error) => {
                warn!(task_id, %error, "task failed");
                self.events.emit(EventKind::TaskFailed {
                    task_id: Arc::from(task_id),
                    error: error.clone(),
                    duration_ms: result.execution_time_ms,
                });
            }
            None => {
                debug!(task_id, duration_ms = result.execution_time_ms, "task completed");
                self.events.emit(EventKind::TaskCompleted {
                    task_id: Arc::from(task_id),
                    duration_ms: result.execution_time_ms,
                });
            }
        }

        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
