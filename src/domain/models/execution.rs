//! Execution results and the per-task result set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::task::TaskId;

/// SHA-256 hex digest of a task output.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Outcome of running one task (all of its attempts) through the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub success: bool,
    /// Agent output text; empty for failed and blocked tasks.
    #[serde(default)]
    pub output: String,
    /// Last error when the task failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Ordered audit records, one or more per attempt.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Attempts consumed. Zero for tasks that were never dispatched.
    #[serde(default)]
    pub attempts: u32,
    /// Digest of `output` taken when the result was produced. Empty when the
    /// producer recorded none; such evidence cannot be integrity-checked.
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
    /// Set when this result was produced by a repair task.
    #[serde(default)]
    pub repaired_by: Option<TaskId>,
    /// Failed dependency that kept this task from being dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<TaskId>,
}

impl ExecutionResult {
    /// Successful result; hashes `output`.
    pub fn succeeded(task_id: TaskId, output: impl Into<String>, logs: Vec<String>, attempts: u32) -> Self {
        let output = output.into();
        Self {
            task_id,
            success: true,
            content_hash: content_hash(&output),
            output,
            error: None,
            logs,
            attempts,
            duration_ms: 0,
            finished_at: Utc::now(),
            repaired_by: None,
            blocked_by: None,
        }
    }

    /// Failed result with no output.
    pub fn failed(task_id: TaskId, error: impl Into<String>, logs: Vec<String>, attempts: u32) -> Self {
        Self {
            task_id,
            success: false,
            output: String::new(),
            content_hash: content_hash(""),
            error: Some(error.into()),
            logs,
            attempts,
            duration_ms: 0,
            finished_at: Utc::now(),
            repaired_by: None,
            blocked_by: None,
        }
    }

    /// Synthetic result for a task that was never dispatched because a
    /// dependency failed.
    pub fn blocked(task_id: TaskId, failed_dependency: TaskId) -> Self {
        let mut result = Self::failed(
            task_id,
            format!("Blocked: dependency {failed_dependency} failed"),
            vec![format!(
                "Task {task_id} not dispatched: dependency {failed_dependency} failed"
            )],
            0,
        );
        result.blocked_by = Some(failed_dependency);
        result
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// True when the task was never dispatched because a dependency failed.
    pub fn was_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }

    /// Whether `output` still matches the digest recorded at result time.
    pub fn hash_matches(&self) -> bool {
        self.content_hash == content_hash(&self.output)
    }

    /// Logs joined into one block of text.
    pub fn log_text(&self) -> String {
        self.logs.join("\n")
    }
}

/// Latest result per task id, plus every result ever recorded.
///
/// Recording a result for an id that already has one supersedes it; the old
/// one stays in the history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    latest: BTreeMap<TaskId, ExecutionResult>,
    history: Vec<ExecutionResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result`, superseding any earlier result for its task.
    pub fn record(&mut self, result: ExecutionResult) {
        self.history.push(result.clone());
        self.latest.insert(result.task_id, result);
    }

    /// Latest result for `id`.
    pub fn get(&self, id: TaskId) -> Option<&ExecutionResult> {
        self.latest.get(&id)
    }

    /// Latest results in task id order.
    pub fn latest(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.latest.values()
    }

    /// Every recorded result, in recording order.
    pub fn history(&self) -> &[ExecutionResult] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Whether every latest result succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.latest.values().all(|r| r.success)
    }

    /// Split into the latest results (by task id) and the full history.
    pub fn into_parts(self) -> (Vec<ExecutionResult>, Vec<ExecutionResult>) {
        (self.latest.into_values().collect(), self.history)
    }
}

impl FromIterator<ExecutionResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ExecutionResult>>(iter: I) -> Self {
        let mut set = Self::new();
        for result in iter {
            set.record(result);
        }
        set
    }
}
