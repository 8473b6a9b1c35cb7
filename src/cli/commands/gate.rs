//! `taskmend gate`: score a candidate response against recorded results.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::cli::commands::read_input;
use crate::cli::output::TableFormatter;
use crate::cli::types::GateArgs;
use crate::domain::models::{Config, ExecutionResult, GateContext};
use crate::services::QualityGatePipeline;

/// Accepted shapes of the `--results` file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsInput {
    List(Vec<ExecutionResult>),
    Report { final_results: Vec<ExecutionResult> },
    RunOutput { report: ReportResults },
}

#[derive(Deserialize)]
struct ReportResults {
    final_results: Vec<ExecutionResult>,
}

impl ResultsInput {
    fn into_results(self) -> Vec<ExecutionResult> {
        match self {
            Self::List(results) | Self::Report { final_results: results } => results,
            Self::RunOutput { report } => report.final_results,
        }
    }
}

async fn read_results(path: &Path) -> Result<Vec<ExecutionResult>> {
    let raw = read_input(path).await?;
    let input: ResultsInput = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse results {}", path.display()))?;
    Ok(input.into_results())
}

/// Handle `gate`: score a candidate and fail when it is rejected.
pub async fn execute(args: GateArgs, config: &Config, json: bool) -> Result<()> {
    let candidate = read_input(&args.candidate).await?;
    let results = read_results(&args.results).await?;
    let mut prior = Vec::with_capacity(args.prior.len());
    for path in &args.prior {
        prior.push(read_input(path).await?);
    }

    let mut gate_config = config.quality_gate.clone();
    gate_config.strict |= args.strict;
    let pipeline = QualityGatePipeline::with_default_checkers(gate_config);

    let ctx = GateContext::from_results(&results).with_prior_responses(prior);
    let result = pipeline.evaluate(&candidate, &ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let formatter = TableFormatter::new();
        println!(
            "Score: {} / threshold {} ({})",
            result.score,
            result.threshold,
            if result.passed { "passed" } else { "rejected" }
        );
        println!("{}", formatter.format_checker_reports(&result.checker_reports));
        if result.issues.is_empty() {
            println!("No issues found.");
        } else {
            println!("{}", formatter.format_issues(&result.issues));
        }
    }

    if !result.passed {
        anyhow::bail!(
            "Candidate rejected by quality gate: score {} below threshold {} or blocking issues present",
            result.score,
            result.threshold
        );
    }
    Ok(())
}
