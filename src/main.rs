//! Dossier CLI - staged due diligence pipeline

use clap::{Parser, Subcommand};
use colored::Colorize;

use dossier::agent::{AgentLayer, AgentRegistry};
use dossier::config::PipelineConfig;
use dossier::error::{DossierError, FixSuggestion};
use dossier::provider::create_provider;
use dossier::runtime::WorkflowEngine;
use dossier::samples;
use dossier::state::RunState;

#[derive(Parser)]
#[command(name = "dossier")]
#[command(about = "Dossier - staged due diligence pipeline over a subject company")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline against a subject
    Run {
        /// Subject company name
        #[arg(short, long)]
        name: Option<String>,

        /// One-paragraph description of the subject
        #[arg(short, long)]
        description: Option<String>,

        /// Run against a built-in sample subject instead
        #[arg(short, long, conflicts_with_all = ["name", "description"])]
        sample: Option<String>,

        /// Override the provider (ollama, mock)
        #[arg(short, long)]
        provider: Option<String>,

        /// Override the model id
        #[arg(short, long)]
        model: Option<String>,

        /// Minimum fraction of research tasks that must succeed
        #[arg(long)]
        min_success_ratio: Option<f64>,

        /// Research re-runs allowed before the gate gives up
        #[arg(long)]
        max_retries: Option<u32>,

        /// Finish degraded runs at PARTIAL instead of COMPLETE
        #[arg(long)]
        partial_on_degraded: bool,

        /// Print the final state as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the run's event log to a file as NDJSON
        #[arg(long, value_name = "PATH")]
        events: Option<String>,
    },

    /// List the registered agents by layer
    Agents,

    /// List the built-in sample subjects
    Samples,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Initialize tracing; logs go to stderr so --json stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            name,
            description,
            sample,
            provider,
            model,
            min_success_ratio,
            max_retries,
            partial_on_degraded,
            json,
            events,
        } => {
            run_pipeline(RunArgs {
                name,
                description,
                sample,
                provider,
                model,
                min_success_ratio,
                max_retries,
                partial_on_degraded,
                json,
                events,
            })
            .await
        }
        Commands::Agents => {
            list_agents();
            Ok(())
        }
        Commands::Samples => {
            list_samples();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

struct RunArgs {
    name: Option<String>,
    description: Option<String>,
    sample: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    min_success_ratio: Option<f64>,
    max_retries: Option<u32>,
    partial_on_degraded: bool,
    json: bool,
    events: Option<String>,
}

async fn run_pipeline(args: RunArgs) -> Result<(), DossierError> {
    // Precedence: defaults < environment < CLI flags
    let mut config = PipelineConfig::default().with_env();
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(ratio) = args.min_success_ratio {
        config.min_success_ratio = ratio;
    }
    if let Some(retries) = args.max_retries {
        config.max_retries = retries;
    }
    if args.partial_on_degraded {
        config.partial_on_degraded = true;
    }

    // Missing name/description are left empty on purpose; the pipeline's
    // input check reports them as run errors rather than CLI errors.
    let (subject_name, subject_description) = match args.sample {
        Some(sample_name) => {
            let sample = samples::find(&sample_name)?;
            (sample.name.to_string(), sample.description.to_string())
        }
        None => (
            args.name.unwrap_or_default(),
            args.description.unwrap_or_default(),
        ),
    };

    let provider = create_provider(&config.provider)?;
    if !args.json {
        println!(
            "{} Using provider: {} | model: {}",
            "→".cyan(),
            config.provider.cyan().bold(),
            config.model.cyan()
        );
    }

    let engine = WorkflowEngine::new(config, provider)?.with_quiet(args.json);
    let state = engine.run(&subject_name, &subject_description).await;

    if let Some(path) = args.events {
        std::fs::write(&path, engine.events().to_ndjson()?)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_outcome(&state);
    }
    Ok(())
}

/// Report excerpt and decision, printed after the engine's own summary.
fn print_outcome(state: &RunState) {
    const EXCERPT_LINES: usize = 12;

    if let Some(report) = state.report() {
        println!("\n{}", "Report".cyan().bold());
        for line in report.lines().take(EXCERPT_LINES) {
            println!("{}", line);
        }
        if report.lines().count() > EXCERPT_LINES {
            println!("...");
        }
    }
    if let Some(decision) = state.decision() {
        println!("\n{}", "Decision".cyan().bold());
        let text = serde_json::to_string_pretty(decision).unwrap_or_else(|_| decision.to_string());
        println!("{}", text);
    }
}

fn list_agents() {
    let registry = AgentRegistry::builtin();
    for layer in [
        AgentLayer::Research,
        AgentLayer::Analysis,
        AgentLayer::Synthesis,
    ] {
        println!("{}", layer.as_str().to_uppercase().bold());
        for spec in registry.layer(layer) {
            let tools = if spec.tools.is_empty() {
                String::new()
            } else {
                format!(" [{}]", spec.tools.join(", "))
            };
            println!("  {:<20} {}{}", spec.name, spec.description, tools);
        }
        println!();
    }
}

fn list_samples() {
    for sample in samples::all() {
        println!("{}", sample.name.bold());
        println!("  {}", sample.description);
        println!();
    }
}
