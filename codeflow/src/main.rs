//! Iterative code-generation workflow CLI.
//!
//! `codeflow run` sends a query through the generate / test + rank / validate
//! loop and prints the best solution with the final run state. `codeflow graph`
//! only writes the workflow diagram.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use codeflow::agents::validator::PlaceholderValidator;
use codeflow::core::graph::WorkflowGraph;
use codeflow::core::state::RunState;
use codeflow::core::types::Candidate;
use codeflow::exit_codes;
use codeflow::io::codex::CodexGateway;
use codeflow::io::config::{DEFAULT_CONFIG_FILE, FlowConfig, GatewayBackend, load_config};
use codeflow::io::diagram::write_diagram;
use codeflow::io::gateway::CompletionGateway;
use codeflow::io::openai::OpenAiGateway;
use codeflow::logging;
use codeflow::workflow::{RunStop, Workflow, WorkflowSettings};

const DEFAULT_QUERY: &str = "write a function to add two numbers";

#[derive(Parser)]
#[command(
    name = "codeflow",
    version,
    about = "Generate, rank and validate code solutions with a language model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the workflow for a query and print the best solution and final state.
    Run {
        /// Programming problem to solve.
        #[arg(short, long, default_value = DEFAULT_QUERY)]
        query: String,
        /// Config file (defaults to `codeflow.toml` in the working directory).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the workflow diagram without running anything.
    Graph {
        /// Output directory (defaults to the configured `output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { query, config } => cmd_run(&query, config.as_deref()),
        Command::Graph { out } => cmd_graph(out),
    }
}

fn cmd_run(query: &str, config_path: Option<&Path>) -> Result<i32> {
    let config = load_config(config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)))?;
    let gateway = build_gateway(&config)?;
    let workflow = Workflow::new(
        gateway.as_ref(),
        &PlaceholderValidator,
        WorkflowSettings::from_config(&config),
    );

    let mut state = RunState::new(query);
    let stop = workflow.run(&mut state, |transition| {
        info!(
            from = %transition.from,
            to = %transition.to,
            iteration = transition.iteration,
            "transition"
        );
    })?;

    match &state.best_solution {
        Some(best) => println!("{}", format_solution(best)),
        None => println!("No solution was selected."),
    }
    let final_state = serde_json::to_string_pretty(&state).context("serialize final state")?;
    println!("{final_state}");

    let paths = write_diagram(&config.output_dir, &WorkflowGraph::standard())?;
    info!(dot = %paths.dot_path.display(), "wrote workflow diagram");

    Ok(match stop {
        RunStop::Succeeded => exit_codes::OK,
        RunStop::RetriesExhausted { iterations } => {
            eprintln!("validation still failing after {iterations} iterations");
            exit_codes::EXHAUSTED
        }
    })
}

fn cmd_graph(out: Option<PathBuf>) -> Result<i32> {
    let dir = match out {
        Some(dir) => dir,
        None => load_config(Path::new(DEFAULT_CONFIG_FILE))?.output_dir,
    };
    let paths = write_diagram(&dir, &WorkflowGraph::standard())?;
    println!("{}", paths.dot_path.display());
    if let Some(png) = paths.png_path {
        println!("{}", png.display());
    }
    Ok(exit_codes::OK)
}

fn build_gateway(config: &FlowConfig) -> Result<Box<dyn CompletionGateway>> {
    Ok(match config.gateway.backend {
        GatewayBackend::Openai => Box::new(OpenAiGateway::new(&config.gateway)?),
        GatewayBackend::Codex => Box::new(CodexGateway::new(&config.gateway)),
    })
}

fn format_solution(best: &Candidate) -> String {
    let mut out = format!("Best solution:\n{}\n", best.prefix.trim());
    if !best.imports.trim().is_empty() {
        out.push('\n');
        out.push_str(best.imports.trim_end());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(best.code.trim_end());
    out
}
