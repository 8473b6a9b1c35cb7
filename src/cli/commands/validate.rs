//! `taskmend validate`.

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::commands::read_plan;
use crate::cli::output::TableFormatter;
use crate::cli::types::ValidateArgs;
use crate::services::PlanValidator;

/// Handle `validate`: structural checks only, nothing is dispatched.
pub async fn execute(args: ValidateArgs, json: bool) -> Result<()> {
    let plan = read_plan(&args.plan).await?;
    let validated = PlanValidator::new()
        .validate(&plan)
        .context("Plan failed validation")?;
    let waves = validated.waves();

    if json {
        let output = json!({
            "valid": true,
            "objective": plan.objective,
            "task_count": plan.len(),
            "order": validated.order,
            "waves": waves,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Plan: {}", plan.objective);
        println!("{}", TableFormatter::new().format_plan(&plan, &waves));
        println!(
            "\n{} task{} in {} wave{}",
            plan.len(),
            if plan.len() == 1 { "" } else { "s" },
            waves.len(),
            if waves.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
