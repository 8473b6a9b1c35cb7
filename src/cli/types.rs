//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface.
#[derive(Parser)]
#[command(name = "taskmend")]
#[command(about = "taskmend - dependency-aware task execution with self-healing and a quality gate", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .taskmend/config.yaml plus TASKMEND_* overrides)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check a plan for structural errors and print its execution waves
    Validate(ValidateArgs),

    /// Execute a plan, repairing failed tasks
    Run(RunArgs),

    /// Score a synthesized answer against recorded task results
    Gate(GateArgs),
}

/// Check a plan for structural errors and print its execution waves
#[derive(Args)]
pub struct ValidateArgs {
    /// Plan file (JSON), `-` for stdin
    pub plan: PathBuf,
}

/// Execute a plan, repairing failed tasks
#[derive(Args)]
pub struct RunArgs {
    /// Plan file (JSON), `-` for stdin
    pub plan: PathBuf,

    /// Use an echoing scripted agent instead of the configured program
    #[arg(long)]
    pub dry_run: bool,

    /// Override healing.max_cycles
    #[arg(long)]
    pub max_cycles: Option<u32>,

    /// Gate this candidate answer against the mission results when done
    #[arg(long)]
    pub candidate: Option<PathBuf>,
}

/// Score a synthesized answer against recorded task results
#[derive(Args)]
pub struct GateArgs {
    /// Candidate answer file, `-` for stdin
    pub candidate: PathBuf,

    /// Task results: a JSON array of results or a `run --json` report
    #[arg(short, long)]
    pub results: PathBuf,

    /// Earlier responses to compare against (repeatable)
    #[arg(short, long)]
    pub prior: Vec<PathBuf>,

    /// Use the strict threshold
    #[arg(long)]
    pub strict: bool,
}
