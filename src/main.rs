//! gsd-council - plan and verification engine for council workflows.
//!
//! Parses GSD plans, checks their structure, scores execution responses and
//! council agreement, and keeps project state in `STATE.md`.

#![allow(clippy::single_match_else)]

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gsd_council::core::Config;
use gsd_council::workflow::{
    execution_prompt, parse_plan, planning_prompt, verification_prompt, AgentTemplates,
    ContextManager, CouncilResponse, FileOutcome, GsdPlan, GsdTask, RaterRanking,
    VerificationStatus, Verifier, EXECUTOR_AGENT, PLANNER_AGENT, VERIFIER_AGENT,
};
use gsd_council::{StateStore, WorkflowError};

/// Plan and verification engine for council workflows
#[derive(Parser)]
#[command(name = "gsd-council")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (overrides the default lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root containing the planning directory
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a plan and print its structure
    Parse {
        /// Plan file
        plan: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a plan's structure
    Verify {
        /// Plan file
        plan: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Exit with status 1 unless every check passed
        #[arg(long)]
        strict: bool,
    },

    /// Score an execution response against a task's done criteria
    CheckResponse {
        /// Plan file
        plan: PathBuf,

        /// Task number (1-based)
        #[arg(short, long, default_value = "1")]
        task: usize,

        /// Response file, or '-' for stdin
        #[arg(long, default_value = "-")]
        response: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Score council agreement from a JSON file of responses and rankings
    Consensus {
        /// JSON file with `responses` and `rankings` arrays
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Report context-window quality for a token count
    Context {
        /// Tokens used so far
        #[arg(short, long)]
        tokens: u64,

        /// Override the configured token budget
        #[arg(long)]
        max_tokens: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or update project state
    State {
        #[command(subcommand)]
        operation: StateOperation,
    },

    /// Assemble the minimal context for a task
    MinimalContext {
        /// Task description
        #[arg(short, long)]
        task: String,

        /// Files relevant to the task, relative to the project root
        files: Vec<String>,
    },

    /// Render council prompts
    Prompt {
        #[command(subcommand)]
        operation: PromptOperation,
    },

    /// Show configuration
    Config {
        /// Show config directory path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StateOperation {
    /// Print the current state
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Replace the current position
    Position {
        /// New position
        text: String,
    },

    /// Record a decision
    Decide {
        /// Decision text
        text: String,
    },

    /// Record a blocker
    Block {
        /// Blocker text
        text: String,
    },

    /// Record a concern
    Concern {
        /// Concern text
        text: String,
    },
}

#[derive(Subcommand)]
enum PromptOperation {
    /// Planning prompt for a request
    Plan {
        /// What the council should plan
        request: String,

        /// Extra context for the planners
        #[arg(long)]
        context: Option<String>,
    },

    /// Execution prompt for one task of a plan
    Execute {
        /// Plan file
        plan: PathBuf,

        /// Task number (1-based)
        #[arg(short, long, default_value = "1")]
        task: usize,
    },

    /// Verification prompt for one task of a plan
    Verify {
        /// Plan file
        plan: PathBuf,

        /// Task number (1-based)
        #[arg(short, long, default_value = "1")]
        task: usize,
    },

    /// Print a GSD agent template (planner, executor, verifier)
    Template {
        /// Agent role
        agent: String,
    },
}

/// Payload accepted by the `consensus` command.
#[derive(Deserialize)]
struct ConsensusInput {
    #[serde(default)]
    responses: Vec<CouncilResponse>,

    #[serde(default)]
    rankings: Vec<RaterRanking>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    // Handle commands
    match cli.command {
        Commands::Parse { plan, format } => {
            cmd_parse(&plan, format)?;
        }
        Commands::Verify { plan, format, strict } => {
            cmd_verify(&config, &plan, format, strict)?;
        }
        Commands::CheckResponse { plan, task, response, format } => {
            cmd_check_response(&config, &plan, task, &response, format)?;
        }
        Commands::Consensus { input, format } => {
            cmd_consensus(&config, &input, format)?;
        }
        Commands::Context { tokens, max_tokens, format } => {
            cmd_context(config, &cli.root, tokens, max_tokens, format)?;
        }
        Commands::State { operation } => {
            cmd_state(&config, &cli.root, operation)?;
        }
        Commands::MinimalContext { task, files } => {
            cmd_minimal_context(&config, &cli.root, &task, &files)?;
        }
        Commands::Prompt { operation } => {
            cmd_prompt(&config, operation)?;
        }
        Commands::Config { path } => {
            cmd_config(&config, path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn read_plan(path: &Path) -> Result<GsdPlan> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkflowError::io(path, e))
        .context("Failed to read plan")?;
    Ok(parse_plan(&content))
}

/// Look up a task by its 1-based number.
fn select_task(plan: &GsdPlan, number: usize) -> Result<&GsdTask> {
    number
        .checked_sub(1)
        .and_then(|i| plan.task(i))
        .ok_or_else(|| WorkflowError::TaskIndex { index: number, count: plan.tasks.len() }.into())
}

fn status_line(status: VerificationStatus) -> String {
    format!("{} {}", status.emoji(), status.as_str().to_uppercase())
}

/// Print a plan's parsed structure.
fn cmd_parse(path: &Path, format: OutputFormat) -> Result<()> {
    let plan = read_plan(path)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!("Plan: {}", plan.name);
            if let Some(ref phase) = plan.phase {
                println!("Phase: {phase}");
            }
            if !plan.objective.is_empty() {
                println!("Objective: {}", plan.objective);
            }
            for file in &plan.context_files {
                println!("Context: {file}");
            }
            println!("\nTasks: {}", plan.tasks.len());
            for (i, task) in plan.tasks.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, task.task_type, task.name);
                if !task.files.is_empty() {
                    println!("     files: {}", task.files.join(", "));
                }
            }
            if !plan.success_criteria.is_empty() {
                println!("\nSuccess criteria:");
                for criterion in &plan.success_criteria {
                    println!("  - {criterion}");
                }
            }
        }
    }

    Ok(())
}

/// Run structural checks over a plan.
fn cmd_verify(config: &Config, path: &Path, format: OutputFormat, strict: bool) -> Result<()> {
    let plan = read_plan(path)?;
    let report = Verifier::new(config.verifier.clone()).verify_plan_structure(&plan);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report.to_markdown()),
    }

    if strict && report.overall_status != VerificationStatus::Passed {
        std::process::exit(1);
    }

    Ok(())
}

/// Score an execution response.
fn cmd_check_response(
    config: &Config,
    path: &Path,
    number: usize,
    response: &str,
    format: OutputFormat,
) -> Result<()> {
    let plan = read_plan(path)?;
    let task = select_task(&plan, number)?;

    let text = if response == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("Failed to read response from stdin")?;
        buf
    } else {
        std::fs::read_to_string(response)
            .map_err(|e| WorkflowError::io(response, e))
            .context("Failed to read response")?
    };

    let result = Verifier::new(config.verifier.clone()).verify_execution_response(task, &text);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("{} {}", status_line(result.status), result.name);
            if !result.message.is_empty() {
                println!("{}", result.message);
            }
            for (key, value) in &result.details {
                println!("  {key}: {value}");
            }
        }
    }

    Ok(())
}

/// Score council agreement.
fn cmd_consensus(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkflowError::io(path, e))
        .context("Failed to read consensus input")?;
    let input: ConsensusInput = serde_json::from_str(&content)
        .map_err(WorkflowError::from)
        .context("Invalid consensus input")?;

    let result = Verifier::new(config.verifier.clone())
        .verify_council_consensus(&input.responses, &input.rankings);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("{} {}", status_line(result.status), result.message);
            for (key, value) in &result.details {
                println!("  {key}: {value}");
            }
        }
    }

    Ok(())
}

/// Report context quality.
fn cmd_context(
    mut config: Config,
    root: &Path,
    tokens: u64,
    max_tokens: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(max_tokens) = max_tokens {
        config.context.max_tokens = max_tokens;
    }

    let mut manager = ContextManager::new(root, &config)?;
    manager.update_context_usage(tokens);
    let status = manager.quality_status();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        _ => {
            println!(
                "Usage: {:.1}% ({} / {} tokens)",
                status.usage_percent, status.tokens_used, status.max_tokens
            );
            println!("Quality: {}", status.quality_tier);
            if status.should_checkpoint {
                println!("Checkpoint recommended: save state and start a fresh session");
            }
        }
    }

    Ok(())
}

/// Show or mutate project state.
fn cmd_state(config: &Config, root: &Path, operation: StateOperation) -> Result<()> {
    let mut store = StateStore::open(config.paths.state_path_in(root))?;

    match operation {
        StateOperation::Show { format } => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(store.state())?),
            _ => print!("{}", store.state().to_markdown()),
        },
        StateOperation::Position { text } => {
            store.update_position(text)?;
            println!("Position updated");
        }
        StateOperation::Decide { text } => {
            store.add_decision(text)?;
            println!("Decision recorded");
        }
        StateOperation::Block { text } => {
            store.add_blocker(text)?;
            println!("Blocker recorded");
        }
        StateOperation::Concern { text } => {
            store.add_concern(text)?;
            println!("Concern recorded");
        }
    }

    Ok(())
}

/// Print the minimal context for a task as JSON.
fn cmd_minimal_context(config: &Config, root: &Path, task: &str, files: &[String]) -> Result<()> {
    let manager = ContextManager::new(root, config)?;
    let context = manager.minimal_context(task, files);

    for file in &context.files {
        if let FileOutcome::Skipped { ref reason } = file.outcome {
            eprintln!("skipped {}: {reason}", file.path);
        }
    }

    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

/// Render a council prompt.
fn cmd_prompt(config: &Config, operation: PromptOperation) -> Result<()> {
    match operation {
        PromptOperation::Plan { request, context } => {
            print!("{}", planning_prompt(&request, context.as_deref()));
        }
        PromptOperation::Execute { plan, task } => {
            let plan = read_plan(&plan)?;
            select_task(&plan, task)?;
            print!("{}", execution_prompt(&plan, task - 1));
        }
        PromptOperation::Verify { plan, task } => {
            let plan = read_plan(&plan)?;
            print!("{}", verification_prompt(select_task(&plan, task)?));
        }
        PromptOperation::Template { agent } => {
            let name = match agent.to_lowercase().as_str() {
                "planner" | "gsd-planner" => PLANNER_AGENT,
                "executor" | "gsd-executor" => EXECUTOR_AGENT,
                "verifier" | "gsd-verifier" => VERIFIER_AGENT,
                _ => anyhow::bail!("Unknown agent: {agent}. Supported: planner, executor, verifier"),
            };
            let Some(dir) = config.paths.templates_dir() else {
                anyhow::bail!("No templates_dir configured under [paths]");
            };
            match AgentTemplates::new(dir).load(name)? {
                Some(template) => print!("{template}"),
                None => anyhow::bail!("Template {name} not found"),
            }
        }
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    println!("{}", config.to_toml()?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "gsd-council", &mut io::stdout());
}
