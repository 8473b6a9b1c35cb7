//! Quality gate data: issues, checker outcomes, gate context and results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::execution::ExecutionResult;
use super::task::TaskId;

/// Severity of a validation issue. Any `Error` fails the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; costs nothing.
    Info,
    Warning,
    /// Blocks acceptance regardless of score.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One finding from a checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub checker_name: String,
    pub severity: Severity,
    pub message: String,
    /// Citation into task evidence, e.g. `[Task #3]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,
}

impl ValidationIssue {
    pub fn new(checker_name: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            checker_name: checker_name.into(),
            severity,
            message: message.into(),
            evidence_ref: None,
        }
    }

    /// Point the issue at `task_id` as `[Task #N]`.
    pub fn with_evidence(mut self, task_id: TaskId) -> Self {
        self.evidence_ref = Some(format!("[Task {task_id}]"));
        self
    }
}

/// What a single checker contributes to the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Added to the running score. Penalties are negative.
    pub score_delta: i32,
    /// Findings behind the penalty.
    pub issues: Vec<ValidationIssue>,
}

impl CheckOutcome {
    /// No penalty and no issues.
    pub fn clean() -> Self {
        Self::default()
    }

    /// Subtract `amount` from the delta and record `issue`.
    pub fn penalize(&mut self, amount: i32, issue: ValidationIssue) {
        self.score_delta = self.score_delta.saturating_sub(amount);
        self.issues.push(issue);
    }
}

/// Evidence recorded for one task, as seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvidence {
    pub task_id: TaskId,
    /// Output text of the task.
    pub content: String,
    /// Digest recorded when the result was produced.
    pub recorded_hash: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl From<&ExecutionResult> for TaskEvidence {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            task_id: result.task_id,
            content: result.output.clone(),
            recorded_hash: result.content_hash.clone(),
            logs: result.logs.clone(),
        }
    }
}

/// Everything a checker may consult besides the candidate text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateContext {
    /// Evidence per task id.
    pub evidence: BTreeMap<TaskId, TaskEvidence>,
    /// Earlier responses in the same session, oldest first.
    #[serde(default)]
    pub prior_responses: Vec<String>,
}

impl GateContext {
    /// Evidence for each of `results`, with no prior responses.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExecutionResult>) -> Self {
        Self {
            evidence: results
                .into_iter()
                .map(|r| (r.task_id, TaskEvidence::from(r)))
                .collect(),
            prior_responses: Vec::new(),
        }
    }

    pub fn with_prior_responses(mut self, prior: impl IntoIterator<Item = String>) -> Self {
        self.prior_responses.extend(prior);
        self
    }

    /// Output and log text of every task, in id order.
    pub fn evidence_texts(&self) -> impl Iterator<Item = &str> {
        self.evidence.values().flat_map(|e| {
            std::iter::once(e.content.as_str()).chain(e.logs.iter().map(String::as_str))
        })
    }
}

/// Timing and contribution of one checker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerReport {
    pub checker_name: String,
    pub score_delta: i32,
    pub issue_count: usize,
    pub duration_ms: u64,
    /// The checker errored or panicked and was isolated.
    pub isolated: bool,
}

/// Aggregated gate decision for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateResult {
    /// Final score, clamped to `0..=100`.
    pub score: u8,
    /// Threshold in effect; strict mode raises it.
    pub threshold: u8,
    /// Score reached the threshold and no issue is an error.
    pub passed: bool,
    /// Issues from every checker, in checker order.
    pub issues: Vec<ValidationIssue>,
    /// One report per checker, in run order.
    #[serde(default)]
    pub checker_reports: Vec<CheckerReport>,
}

impl QualityGateResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Issues raised by the named checker.
    pub fn issues_by(&self, checker_name: &str) -> impl Iterator<Item = &ValidationIssue> {
        let name = checker_name.to_string();
        self.issues.iter().filter(move |i| i.checker_name == name)
    }
}
