//! Repair planner: turns erroneous execution results into repair tasks.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::domain::models::{AgentRole, ExecutionResult, Task, TaskId, TaskOrigin};
use crate::services::bounded_executor::is_attempt_record;

/// Log lines quoted in a repair description.
const MAX_EXCERPT_LINES: usize = 5;

/// Known error signatures in agent and tool logs.
static ERROR_SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)permission denied",
        r"(?i)\bnot found\b|no such file or directory",
        r"(?i)outside (?:of )?(?:the )?allowed (?:path|paths|directory|directories|workspace)|(?:path|directory) is not allowed|access denied",
        r"(?i)^\s*(?:error\b|\[error\]|failed\b)",
        r"(?i)\b[a-z][\w-]* failed\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("error signature patterns are valid"))
    .collect()
});

/// Whether a single log line carries a known error signature.
pub fn matches_error_signature(line: &str) -> bool {
    ERROR_SIGNATURES.iter().any(|re| re.is_match(line))
}

/// Agent log lines that carry an error signature.
pub fn error_lines(result: &ExecutionResult) -> Vec<&str> {
    result
        .logs
        .iter()
        .map(String::as_str)
        .filter(|line| !is_attempt_record(line) && matches_error_signature(line))
        .collect()
}

/// A result needs repair if it failed or its agent logs show an error.
pub fn is_erroneous(result: &ExecutionResult) -> bool {
    !result.success || !error_lines(result).is_empty()
}

/// Synthesises one repair task per erroneous result.
#[derive(Debug, Clone, Default)]
pub struct RepairPlanner;

impl RepairPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan repairs for `results`.
    ///
    /// `tasks` supplies the original descriptions; repair ids are allocated
    /// from `first_id` upwards. Repairs are roots of a fresh graph, except
    /// that the repair of a blocked task runs after the repair of the
    /// dependency that blocked it.
    ///
    /// Returns `None` when the ids from `first_id` to `u32::MAX` cannot
    /// cover every erroneous result.
    pub fn plan(
        &self,
        objective: &str,
        tasks: &[Task],
        results: &[ExecutionResult],
        first_id: TaskId,
    ) -> Option<Vec<Task>> {
        let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
        let erroneous: Vec<&ExecutionResult> = results.iter().filter(|r| is_erroneous(r)).collect();

        let available = u64::from(u32::MAX - first_id.0) + 1;
        if u64::try_from(erroneous.len()).unwrap_or(u64::MAX) > available {
            return None;
        }
        let repair_ids: HashMap<TaskId, TaskId> = erroneous
            .iter()
            .zip(first_id.0..=u32::MAX)
            .map(|(r, id)| (r.task_id, TaskId(id)))
            .collect();

        let repairs = erroneous
            .into_iter()
            .map(|result| {
                let repair_id = repair_ids[&result.task_id];
                let original = by_id.get(&result.task_id).copied();
                let dependencies: BTreeSet<TaskId> = result
                    .blocked_by
                    .and_then(|cause| repair_ids.get(&cause).copied())
                    .into_iter()
                    .collect();

                Task::new(repair_id, AgentRole::Healer, describe(repair_id, original, result))
                    .with_dependencies(dependencies)
                    .with_origin(TaskOrigin::Repair {
                        repairs: result.task_id,
                        origin_objective: objective.to_string(),
                    })
            })
            .collect();
        Some(repairs)
    }
}

fn describe(repair_id: TaskId, original: Option<&Task>, result: &ExecutionResult) -> String {
    let original_description = original.map_or("(description unavailable)", |t| t.description.as_str());
    let failure = result
        .error
        .clone()
        .unwrap_or_else(|| "completed with errors in its logs".to_string());

    let mut excerpt: Vec<&str> = error_lines(result);
    if excerpt.is_empty() {
        excerpt = result.logs.iter().map(String::as_str).collect();
    }
    let skip = excerpt.len().saturating_sub(MAX_EXCERPT_LINES);
    let excerpt = excerpt[skip..].join("\n");

    let instruction = match result.blocked_by {
        Some(cause) => format!(
            "Carry out the original task now that dependency {cause} is being repaired, and report the outcome."
        ),
        None => "Diagnose and fix the failure above so the original task's goal is achieved, then report exactly what was changed.".to_string(),
    };

    format!(
        "Repair task {repair_id} for task {}: {original_description}\nFailure: {failure}\nLog excerpt:\n{excerpt}\nInstruction: {instruction}",
        result.task_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<Task> {
        vec![
            Task::new(1, AgentRole::Coder, "Write config loader"),
            Task::new(2, AgentRole::Tester, "Test config loader").with_dependencies([1]),
            Task::new(3, AgentRole::Writer, "Document it"),
        ]
    }

    #[test]
    fn test_error_signatures() {
        assert!(matches_error_signature("open /root/x: Permission denied"));
        assert!(matches_error_signature("file not found: src/lib.rs"));
        assert!(matches_error_signature("No such file or directory"));
        assert!(matches_error_signature("path /etc is outside allowed directory"));
        assert!(matches_error_signature("error: could not compile"));
        assert!(matches_error_signature("[ERROR] boom"));
        assert!(matches_error_signature("cargo build failed"));
        assert!(!matches_error_signature("wrote 3 files"));
        assert!(!matches_error_signature("no errors found in 2 files"));
    }

    #[test]
    fn test_executor_attempt_records_are_ignored() {
        let mut result = ExecutionResult::succeeded(TaskId(1), "ok", vec![], 2);
        result.logs = vec![
            "attempt 1: error: Agent reported an error: permission denied".to_string(),
            "attempt 2: succeeded via scripted".to_string(),
        ];
        assert!(!is_erroneous(&result));
    }

    #[test]
    fn test_no_errors_no_repairs() {
        let results = vec![
            ExecutionResult::succeeded(TaskId(1), "done", vec![], 1),
            ExecutionResult::succeeded(TaskId(3), "done", vec![], 1),
        ];
        assert!(RepairPlanner::new()
            .plan("obj", &tasks(), &results, TaskId(4))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_failed_result_yields_repair() {
        let results = vec![ExecutionResult::failed(
            TaskId(1),
            "Agent reported an error: permission denied",
            vec!["write src/config.rs: permission denied".to_string()],
            2,
        )];
        let repairs = RepairPlanner::new()
            .plan("Ship config", &tasks(), &results, TaskId(4))
            .unwrap();

        assert_eq!(repairs.len(), 1);
        let repair = &repairs[0];
        assert_eq!(repair.id, TaskId(4));
        assert_eq!(repair.agent_role, AgentRole::Healer);
        assert_eq!(repair.repairs(), Some(TaskId(1)));
        assert!(repair.dependencies.is_empty());
        assert!(repair.description.starts_with("Repair task #4 for task #1: Write config loader"));
        assert!(repair.description.contains("permission denied"));
        assert!(repair.description.contains("Instruction:"));
        assert!(matches!(
            &repair.origin,
            TaskOrigin::Repair { origin_objective, .. } if origin_objective == "Ship config"
        ));
    }

    #[test]
    fn test_successful_result_with_error_logs_is_repaired() {
        let results = vec![ExecutionResult::succeeded(
            TaskId(3),
            "docs written",
            vec!["docs/index.md not found".to_string()],
            1,
        )];
        let repairs = RepairPlanner::new()
            .plan("obj", &tasks(), &results, TaskId(10))
            .unwrap();
        assert_eq!(repairs.len(), 1);
        assert!(repairs[0].description.contains("completed with errors"));
    }

    #[test]
    fn test_blocked_repair_ordered_after_dependency_repair() {
        let results = vec![
            ExecutionResult::failed(TaskId(1), "boom", vec![], 2),
            ExecutionResult::blocked(TaskId(2), TaskId(1)),
        ];
        let repairs = RepairPlanner::new()
            .plan("obj", &tasks(), &results, TaskId(4))
            .unwrap();

        assert_eq!(repairs.len(), 2);
        assert_eq!(repairs[1].repairs(), Some(TaskId(2)));
        assert!(repairs[1].dependencies.contains(&TaskId(4)));
        assert!(repairs[1].description.contains("dependency #1 is being repaired"));
    }

    #[test]
    fn test_repair_ids_stop_at_the_top_of_the_id_space() {
        let results = vec![
            ExecutionResult::failed(TaskId(1), "boom", vec![], 1),
            ExecutionResult::failed(TaskId(3), "boom", vec![], 1),
        ];
        let planner = RepairPlanner::new();

        let one = planner
            .plan("obj", &tasks(), &results[..1], TaskId(u32::MAX))
            .unwrap();
        assert_eq!(one[0].id, TaskId(u32::MAX));

        assert!(planner
            .plan("obj", &tasks(), &results, TaskId(u32::MAX))
            .is_none());
    }
}
