//! Pipeline engine: drives a run across the stage transition table.
//!
//! The engine owns the only mutable [`RunState`]. One step runs the work
//! the current stage is responsible for, merges the settled delta, and
//! routes on the verdict. A retry verdict at the research gate re-enters
//! the research fan-out through the same table; nothing else loops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tracing::{debug, info};

use crate::agent::{prompts, AgentLayer, AgentRegistry, AgentSpec};
use crate::config::PipelineConfig;
use crate::error::DossierError;
use crate::event::{EventKind, EventLog};
use crate::provider::{PromptRequest, Provider};
use crate::runtime::routing::CompletenessEvaluator;
use crate::runtime::stage::{StageExecutor, StageResult, TaskPlan};
use crate::runtime::task::TaskRunner;
use crate::state::{RunState, Stage, StageOutcome, StateDelta};

/// Orchestrates one due diligence run: research fan-out, completeness
/// gate, analysis, synthesis.
#[derive(Debug)]
pub struct WorkflowEngine {
    config: PipelineConfig,
    registry: AgentRegistry,
    provider: Arc<dyn Provider>,
    executor: StageExecutor,
    evaluator: CompletenessEvaluator,
    events: EventLog,
    quiet: bool,
}

impl WorkflowEngine {
    /// Build an engine over a validated config and a provider. Fails fast
    /// on config or agent catalog problems rather than mid-run.
    pub fn new(
        config: PipelineConfig,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, DossierError> {
        config.validate()?;
        let registry = AgentRegistry::builtin();
        registry.validate()?;

        let evaluator = CompletenessEvaluator::new(config.min_success_ratio, config.max_retries);
        let events = EventLog::new();
        let runner = TaskRunner::new(Arc::clone(&provider), events.clone());
        let executor = StageExecutor::new(runner);

        Ok(Self {
            config,
            registry,
            provider,
            executor,
            evaluator,
            events,
            quiet: false,
        })
    }

    /// Suppress console output. The state and the event log still record
    /// everything; this only silences the progress prints.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The run's event log. Cheap to clone, safe to read mid-run.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run the pipeline to a terminal stage. Task failures are absorbed
    /// into the state; this only returns, it does not error.
    pub async fn run(&self, subject_name: &str, subject_description: &str) -> RunState {
        let started = Instant::now();
        info!(
            subject = subject_name,
            agents = self.registry.len(),
            "pipeline starting"
        );
        self.events.emit(EventKind::PipelineStarted {
            subject: subject_name.to_string(),
            agent_count: self.registry.len(),
        });

        let mut state = RunState::new(subject_name, subject_description);
        while !state.stage().is_terminal() {
            let outcome = self.step(&mut state).await;
            let next = state.stage().next(outcome);
            debug!(stage = %state.stage(), outcome = %outcome, next = %next, "stage transition");
            state.set_stage(next);
        }

        // A run that only validated because the retry budget ran out can
        // be surfaced as PARTIAL instead of COMPLETE.
        if state.stage() == Stage::Complete && self.config.partial_on_degraded {
            let successes = state.research_success_count();
            let total = state.research_outputs().len();
            if self.evaluator.is_degraded(successes, total) {
                state.set_stage(Stage::Partial);
            }
        }

        self.events.emit(EventKind::PipelineCompleted {
            final_stage: state.stage().as_str().to_string(),
            total_duration_ms: started.elapsed().as_millis() as u64,
        });
        self.print_summary(&state, started.elapsed());
        state
    }

    /// Run the work owned by the current stage and report its verdict.
    async fn step(&self, state: &mut RunState) -> StageOutcome {
        match state.stage() {
            Stage::Init => self.initialize(state),
            Stage::InitComplete => self.run_research(state).await,
            Stage::ResearchComplete => self.validate_research(state),
            Stage::ResearchValidated => self.route_research(state).await,
            Stage::AnalysisComplete => self.run_synthesis(state).await,
            Stage::SynthesisComplete => {
                if !self.quiet {
                    println!("  Workflow complete!");
                }
                StageOutcome::Complete
            }
            // Terminal stages never step; the loop guard stops first.
            Stage::Complete | Stage::Partial | Stage::Failed => StageOutcome::Complete,
        }
    }

    fn initialize(&self, state: &mut RunState) -> StageOutcome {
        if !self.quiet {
            println!("Starting Due Diligence Workflow...");
            println!("  Subject: {}", state.subject_name);
        }

        if state.subject_name.trim().is_empty() {
            state.push_error("subject_name is required");
        }
        if state.subject_description.trim().is_empty() {
            state.push_error("subject_description is required");
        }

        if state.has_required_input_error() {
            if !self.quiet {
                for error in state.errors() {
                    println!("  {}", error.red());
                }
            }
            StageOutcome::Failed
        } else {
            StageOutcome::Complete
        }
    }

    async fn run_research(&self, state: &mut RunState) -> StageOutcome {
        let mut plans = Vec::new();
        for spec in self.registry.layer(AgentLayer::Research) {
            if let Some(prompt) = prompts::research_prompt(
                spec.name,
                &state.subject_name,
                &state.subject_description,
            ) {
                plans.push(self.plan_for(spec, prompt));
            }
        }

        let title = if state.retry_count() == 0 {
            format!("STAGE 2: RESEARCH ({} agents in parallel)", plans.len())
        } else {
            format!(
                "STAGE 2: RESEARCH (retry {}/{}, {} agents in parallel)",
                state.retry_count(),
                self.config.max_retries,
                plans.len()
            )
        };
        let batches = vec![plans];
        self.print_banner(&title);
        self.print_starting(&batches);

        let started = Instant::now();
        let stage = self.executor.run_stage(batches).await;
        self.print_stage_results(&stage);
        if !self.quiet {
            println!(
                "\nResearch complete: {}/{} agents in {:.1}s",
                stage.success_count(),
                stage.total(),
                started.elapsed().as_secs_f64()
            );
        }
        self.events.emit(EventKind::StageSettled {
            stage: "research".to_string(),
            successes: stage.success_count(),
            total: stage.total(),
        });

        let errors = stage.error_lines();
        state.apply(StateDelta {
            research_outputs: stage.task_results,
            errors,
            ..Default::default()
        });
        StageOutcome::Complete
    }

    /// Check accumulated research against the success threshold. Records a
    /// CRITICAL error below the line; the verdict itself belongs to the
    /// gate, so validation always settles `Complete`.
    fn validate_research(&self, state: &mut RunState) -> StageOutcome {
        if !self.quiet {
            println!("\nValidating research completeness...");
        }

        let successes = state.research_success_count();
        let total = state.research_outputs().len();

        if total > 0 && (successes as f64 / total as f64) < self.config.min_success_ratio {
            if !self.quiet {
                println!(
                    "{}",
                    format!("CRITICAL: Only {}/{} succeeded", successes, total).red()
                );
            }
            state.push_error(format!(
                "CRITICAL: Only {}/{} research agents succeeded",
                successes, total
            ));
        } else if !self.quiet {
            println!("Validation passed: {}/{} succeeded", successes, total);
        }
        StageOutcome::Complete
    }

    /// The retry gate. A `Complete` verdict runs analysis before settling,
    /// `Incomplete` burns one retry and re-enters the research fan-out,
    /// `Failed` aborts the run.
    async fn route_research(&self, state: &mut RunState) -> StageOutcome {
        let successes = state.research_success_count();
        let total = state.research_outputs().len();
        let outcome = self
            .evaluator
            .evaluate_results(state.research_outputs(), state.retry_count());
        self.events.emit(EventKind::ResearchEvaluated {
            retry_count: state.retry_count(),
            successes,
            total,
            outcome: outcome.as_str().to_string(),
        });

        match outcome {
            StageOutcome::Complete => {
                if self.evaluator.is_degraded(successes, total) && !self.quiet {
                    println!("{}", "Proceeding with partial research data".yellow());
                }
                self.run_analysis(state).await
            }
            StageOutcome::Incomplete => {
                state.increment_retry();
                if !self.quiet {
                    println!(
                        "{}",
                        format!(
                            "Research incomplete, retrying ({}/{})",
                            state.retry_count(),
                            self.config.max_retries
                        )
                        .yellow()
                    );
                }
                StageOutcome::Incomplete
            }
            StageOutcome::Failed => {
                if !self.quiet {
                    println!("{}", "Research failed, aborting run".red());
                }
                StageOutcome::Failed
            }
        }
    }

    async fn run_analysis(&self, state: &mut RunState) -> StageOutcome {
        let research_digest = prompts::digest(state.research_outputs());
        let subject = state.subject_name.clone();

        let mut first_wave = Vec::new();
        for spec in self.registry.layer(AgentLayer::Analysis) {
            if let Some(prompt) = prompts::analysis_prompt(spec.name, &subject, &research_digest) {
                first_wave.push(self.plan_for(spec, prompt));
            }
        }

        let mut batches = vec![first_wave];
        // The risk assessor aggregates the other analysts, so it runs in a
        // second batch with their settled results in hand.
        if let Ok(spec) = self.registry.get("risk_assessor") {
            let model = self.config.resolve_model(spec.model);
            let timeout = self.config.timeout_for(spec.layer);
            let name = spec.name;
            let subject = subject.clone();
            let research = research_digest.clone();
            batches.push(vec![TaskPlan::with_builder(name, timeout, move |prior| {
                let analysis_digest = prompts::digest(&prior.task_results);
                PromptRequest::new(
                    prompts::risk_assessor(&subject, &research, &analysis_digest),
                    model,
                )
            })]);
        }

        let agent_count: usize = batches.iter().map(Vec::len).sum();
        self.print_banner(&format!("STAGE 3: ANALYSIS ({} agents)", agent_count));
        self.print_starting(&batches);

        let stage = self.executor.run_stage(batches).await;
        self.print_stage_results(&stage);
        self.events.emit(EventKind::StageSettled {
            stage: "analysis".to_string(),
            successes: stage.success_count(),
            total: stage.total(),
        });

        let errors = stage.error_lines();
        state.apply(StateDelta {
            analysis_outputs: stage.task_results,
            errors,
            ..Default::default()
        });
        StageOutcome::Complete
    }

    async fn run_synthesis(&self, state: &mut RunState) -> StageOutcome {
        let research_digest = prompts::digest(state.research_outputs());
        let analysis_digest = prompts::digest(state.analysis_outputs());
        let subject = state.subject_name.clone();

        let mut batches = Vec::with_capacity(2);
        if let Ok(spec) = self.registry.get("report_generator") {
            let prompt = prompts::report_generator(&subject, &research_digest, &analysis_digest);
            batches.push(vec![self.plan_for(spec, prompt)]);
        }
        // The decision consumes the finished report, so it runs after it.
        // It is a much shorter call than the report and gets the analysis
        // budget instead of the full synthesis one.
        if let Ok(spec) = self.registry.get("decision_agent") {
            let model = self.config.resolve_model(spec.model);
            let timeout = self.config.timeout_for(AgentLayer::Analysis);
            let name = spec.name;
            let subject = subject.clone();
            batches.push(vec![TaskPlan::with_builder(name, timeout, move |prior| {
                let report = prior
                    .raw_text_of("report_generator")
                    .unwrap_or("(report unavailable)");
                PromptRequest::new(prompts::decision_agent(&subject, report), model)
            })]);
        }

        self.print_banner("STAGE 4: SYNTHESIS (report, then decision)");
        self.print_starting(&batches);

        let stage = self.executor.run_stage(batches).await;
        self.print_stage_results(&stage);
        self.events.emit(EventKind::StageSettled {
            stage: "synthesis".to_string(),
            successes: stage.success_count(),
            total: stage.total(),
        });

        let report = stage.raw_text_of("report_generator").map(str::to_string);
        let decision = stage.output_of("decision_agent").cloned();
        let errors = stage.error_lines();
        state.apply(StateDelta {
            report,
            decision,
            errors,
            ..Default::default()
        });
        StageOutcome::Complete
    }

    fn plan_for(&self, spec: &AgentSpec, prompt: String) -> TaskPlan {
        TaskPlan::new(
            spec.name,
            self.config.timeout_for(spec.layer),
            self.request_for(spec, prompt),
        )
    }

    fn request_for(&self, spec: &AgentSpec, prompt: String) -> PromptRequest {
        let mut request = PromptRequest::new(prompt, self.config.resolve_model(spec.model));
        if !spec.tools.is_empty() {
            if self.provider.supports_tools() {
                request = request.with_tools(spec.tools.iter().map(|t| t.to_string()).collect());
            } else {
                debug!(
                    agent = spec.name,
                    provider = self.provider.name(),
                    "provider lacks tool support, running without tools"
                );
            }
        }
        request
    }

    fn print_banner(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!("\n{}", "=".repeat(60));
        println!("{}", title);
        println!("{}", "=".repeat(60));
    }

    fn print_starting(&self, batches: &[Vec<TaskPlan>]) {
        if self.quiet {
            return;
        }
        for plan in batches.iter().flatten() {
            println!("  Starting: {}", plan.task_id);
        }
    }

    fn print_stage_results(&self, stage: &StageResult) {
        if self.quiet {
            return;
        }
        for result in &stage.task_results {
            if result.success {
                println!(
                    "  {} {} ({:.1}s)",
                    "DONE:".green(),
                    result.task_id,
                    result.execution_time_ms as f64 / 1000.0
                );
            } else {
                let error = result.error.as_deref().unwrap_or("unknown failure");
                let short: String = error.chars().take(50).collect();
                println!("  {} {} - {}", "FAILED:".red(), result.task_id, short);
            }
        }
    }

    fn print_summary(&self, state: &RunState, elapsed: Duration) {
        if self.quiet {
            return;
        }
        println!("\n--- Final State ---");
        let status = match state.stage() {
            Stage::Complete => state.stage().as_str().green().bold(),
            Stage::Partial => state.stage().as_str().yellow().bold(),
            _ => state.stage().as_str().red().bold(),
        };
        println!("Status: {}", status);
        println!(
            "Research: {}/{} succeeded, {} retries",
            state.research_success_count(),
            state.research_outputs().len(),
            state.retry_count()
        );
        if !state.errors().is_empty() {
            println!("Errors:");
            for error in state.errors() {
                println!("  {}", error);
            }
        }
        println!("Elapsed: {:.1}s", elapsed.as_secs_f64());
    }
}
