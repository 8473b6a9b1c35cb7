//! `taskmend run`: execute a plan, heal it and optionally gate a candidate.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::adapters::agents::{ProcessAgent, ScriptedAgent};
use crate::adapters::memory::JsonlMemoryStore;
use crate::cli::commands::{read_input, read_plan};
use crate::cli::output::TableFormatter;
use crate::cli::types::RunArgs;
use crate::domain::models::Config;
use crate::domain::ports::{AgentCall, MemoryStore, NullMemoryStore};
use crate::services::{MissionRunner, PlanValidator, ScheduleEvent};

const EVENT_BUFFER: usize = 64;

/// Handle `run`: execute the plan, heal failures, optionally gate a candidate.
pub async fn execute(args: RunArgs, config: &Config, json: bool) -> Result<()> {
    let plan = read_plan(&args.plan).await?;
    let candidate = match &args.candidate {
        Some(path) => Some(read_input(path).await?),
        None => None,
    };

    let mut config = config.clone();
    if let Some(max_cycles) = args.max_cycles {
        config.healing.max_cycles = max_cycles;
    }

    let agent: Arc<dyn AgentCall> = if args.dry_run {
        info!("Dry run: using scripted echo agent");
        Arc::new(ScriptedAgent::new())
    } else {
        Arc::new(ProcessAgent::new(config.agent.clone()))
    };
    let memory: Arc<dyn MemoryStore> = if config.memory.enabled {
        Arc::new(JsonlMemoryStore::new(&config.memory.directory))
    } else {
        Arc::new(NullMemoryStore::new())
    };

    // Progress lines only in human mode; JSON output stays a single document.
    let (runner, printer) = if json {
        (MissionRunner::build(&config, agent, memory), None)
    } else {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let printer = tokio::spawn(print_events(rx));
        (MissionRunner::build_with_events(&config, agent, memory, tx), Some(printer))
    };

    let report = runner.run(plan).await.context("Mission could not start")?;
    let verdict = candidate
        .as_deref()
        .map(|text| runner.review(text, &report, std::iter::empty()));

    // Dropping the runner closes the event channel so the printer can finish.
    drop(runner);
    if let Some(printer) = printer {
        printer.await.context("Event printer task failed")?;
    }

    if json {
        let output = json!({ "report": report, "gate": verdict });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let formatter = TableFormatter::new();
    println!("\nObjective: {}", report.objective);
    let waves = PlanValidator::new()
        .validate(&report.plan)
        .map(|v| v.waves())
        .unwrap_or_default();
    println!("{}", formatter.format_plan(&report.plan, &waves));
    println!("{}", formatter.format_results(&report.final_results));
    if report.phase_c_skipped {
        println!("Self-healing skipped: single task completed cleanly");
    } else {
        println!("Repair cycles: {}", report.repair_cycles);
    }
    println!(
        "Mission {}",
        if report.mission_success { "succeeded" } else { "failed" }
    );

    if let Some(verdict) = verdict {
        let result = verdict.result();
        println!(
            "\nQuality gate: {} (score {} / threshold {})",
            if verdict.is_accepted() { "accepted" } else { "needs resynthesis" },
            result.score,
            result.threshold
        );
        if !result.issues.is_empty() {
            println!("{}", formatter.format_issues(&result.issues));
        }
    }

    Ok(())
}

async fn print_events(mut rx: mpsc::Receiver<ScheduleEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ScheduleEvent::RunStarted { total_tasks } => {
                println!("Running {total_tasks} task(s)");
            }
            ScheduleEvent::TaskStarted { task_id, running } => {
                println!("  → {task_id} started ({running} running)");
            }
            ScheduleEvent::TaskFinished { task_id, success, attempts } => {
                let mark = if success { "✓" } else { "✗" };
                println!("  {mark} {task_id} finished after {attempts} attempt(s)");
            }
            ScheduleEvent::TaskBlocked { task_id, failed_dependency } => {
                println!("  ⊘ {task_id} blocked by {failed_dependency}");
            }
            ScheduleEvent::RunFinished { succeeded, failed, blocked, peak_running } => {
                println!(
                    "Run finished: {succeeded} succeeded, {failed} failed, {blocked} blocked (peak {peak_running} concurrent)"
                );
            }
        }
    }
}
