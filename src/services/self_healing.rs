//! Self-healing loop.
//!
//! Evaluate the result set, plan repairs for erroneous results, run them
//! through the graph scheduler and merge their results back under the
//! original task ids. Bounded by a cycle budget; running out of cycles or
//! of task ids for repairs is reported, never fatal.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::models::{
    ExecutionResult, LessonLearned, Plan, ResultSet, Task, TaskId, LESSONS_CATEGORY,
};
use crate::domain::ports::MemoryStore;
use crate::services::graph_scheduler::GraphScheduler;
use crate::services::repair_planner::{is_erroneous, RepairPlanner};

/// Characters of a repair output kept in a lesson.
const LESSON_EXCERPT_CHARS: usize = 400;

/// Result of healing one mission.
#[derive(Debug, Clone, Serialize)]
pub struct HealingOutcome {
    /// Latest result per original task, in the order first reported.
    pub final_results: Vec<ExecutionResult>,
    /// All final results succeeded.
    pub success: bool,
    pub repair_cycles: u32,
    /// Every result recorded, superseded ones included.
    pub history: Vec<ExecutionResult>,
    /// Lessons written to the memory store.
    pub lessons_recorded: usize,
}

/// Drives repair cycles until the results are clean or the budget runs out.
pub struct SelfHealingLoop {
    scheduler: Arc<GraphScheduler>,
    planner: RepairPlanner,
    memory: Arc<dyn MemoryStore>,
}

impl SelfHealingLoop {
    pub fn new(scheduler: Arc<GraphScheduler>, memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            scheduler,
            planner: RepairPlanner::new(),
            memory,
        }
    }

    /// Scheduler that runs the repair tasks.
    pub fn scheduler(&self) -> &Arc<GraphScheduler> {
        &self.scheduler
    }

    /// Heal `initial`, the results of the first run of `plan`.
    pub async fn heal(&self, plan: &Plan, initial: Vec<ExecutionResult>, max_cycles: u32) -> HealingOutcome {
        if max_cycles == 0 {
            let success = initial.iter().all(|r| r.success);
            return HealingOutcome {
                history: initial.clone(),
                final_results: initial,
                success,
                repair_cycles: 0,
                lessons_recorded: 0,
            };
        }

        let order: Vec<TaskId> = initial.iter().map(|r| r.task_id).collect();
        let mut results: ResultSet = initial.into_iter().collect();
        let mut next_id = plan.max_task_id().0.checked_add(1);
        let mut cycles = 0u32;
        let mut lessons = 0usize;

        let success = loop {
            let current: Vec<ExecutionResult> = results.latest().cloned().collect();
            let pending = current.iter().filter(|r| is_erroneous(r)).count();

            if pending == 0 {
                break results.all_succeeded();
            }
            if cycles >= max_cycles {
                warn!(pending_repairs = pending, cycles, "Repair budget exhausted with errors remaining");
                break false;
            }
            let Some(mut repairs) = next_id
                .and_then(|first| self.planner.plan(&plan.objective, &plan.tasks, &current, TaskId(first)))
            else {
                warn!(pending_repairs = pending, cycles, "No task ids left for repair tasks");
                break false;
            };

            cycles += 1;
            next_id = next_id
                .zip(u32::try_from(repairs.len()).ok())
                .and_then(|(next, used)| next.checked_add(used));
            let repaired: HashMap<TaskId, TaskId> = repairs
                .iter()
                .filter_map(|t| Some((t.id, t.repairs()?)))
                .collect();

            let span = info_span!("repair_cycle", cycle = cycles, repairs = repairs.len());
            let outcome = self
                .scheduler
                .run_tasks(&mut repairs)
                .instrument(span)
                .await;
            let repair_results = match outcome {
                Ok(r) => r,
                Err(e) => {
                    error!(cycle = cycles, error = %e, "Repair plan rejected");
                    break false;
                }
            };

            let fixed = repair_results.iter().filter(|r| r.success).count();
            info!(cycle = cycles, repairs = repair_results.len(), fixed, "Repair cycle finished");

            if fixed > 0 {
                let lesson = summarize(plan, &current, &repairs, &repair_results, cycles);
                match self.memory.append(LESSONS_CATEGORY, &lesson).await {
                    Ok(()) => lessons += 1,
                    Err(e) => warn!(cycle = cycles, error = %e, "Failed to record lesson"),
                }
            }

            for mut result in repair_results {
                let repair_id = result.task_id;
                let Some(&original) = repaired.get(&repair_id) else {
                    continue;
                };
                result.task_id = original;
                result.repaired_by = Some(repair_id);
                result.blocked_by = result
                    .blocked_by
                    .map(|cause| repaired.get(&cause).copied().unwrap_or(cause));
                results.record(result);
            }
        };

        let (latest, history) = results.into_parts();
        let mut by_id: HashMap<TaskId, ExecutionResult> =
            latest.into_iter().map(|r| (r.task_id, r)).collect();
        let final_results = order.iter().filter_map(|id| by_id.remove(id)).collect();

        info!(success, repair_cycles = cycles, lessons, "Self-healing finished");
        HealingOutcome {
            final_results,
            success,
            repair_cycles: cycles,
            history,
            lessons_recorded: lessons,
        }
    }
}

fn summarize(
    plan: &Plan,
    before: &[ExecutionResult],
    repairs: &[Task],
    repair_results: &[ExecutionResult],
    cycle: u32,
) -> LessonLearned {
    let problem = repairs
        .iter()
        .filter_map(Task::repairs)
        .filter_map(|id| before.iter().find(|r| r.task_id == id))
        .map(|r| {
            let cause = r
                .error
                .clone()
                .unwrap_or_else(|| "errors in logs".to_string());
            format!("Task {}: {cause}", r.task_id)
        })
        .collect::<Vec<_>>()
        .join("; ");

    let solution = repairs
        .iter()
        .zip(repair_results)
        .filter(|(_, r)| r.success)
        .filter_map(|(task, r)| {
            let excerpt: String = r.output.chars().take(LESSON_EXCERPT_CHARS).collect();
            Some(format!("Task {} repaired by {}: {excerpt}", task.repairs()?, task.id))
        })
        .collect::<Vec<_>>()
        .join("; ");

    LessonLearned::new(plan.objective.clone(), problem, solution, cycle)
}
