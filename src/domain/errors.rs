//! Domain errors for the taskmend execution-and-repair engine.

use thiserror::Error;

use super::models::TaskId;

/// Format a cycle path as a human-readable string: `#1 -> #2 -> #1`.
fn format_cycle_path(path: &[TaskId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Structural problems with a plan. Always fatal, raised before any dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Plan objective cannot be empty")]
    EmptyObjective,

    #[error("Duplicate task id {0} in plan")]
    DuplicateTaskId(TaskId),

    #[error("Task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },

    #[error("Task {0} depends on itself")]
    SelfDependency(TaskId),

    /// Closed path of the first cycle found.
    #[error("Task dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<TaskId>),

    #[error("Task {0} has an empty description")]
    EmptyDescription(TaskId),
}

/// Failure modes of the external agent-call capability.
///
/// Timeouts are kept distinct from application errors so the executor can
/// log them differently; both count as failures for circuit breaker purposes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentCallError {
    /// Seconds waited before giving up.
    #[error("Agent call timed out after {0}s")]
    Timeout(u64),

    /// The target could not be reached.
    #[error("Agent target unavailable: {0}")]
    Unavailable(String),

    /// The target answered with an error.
    #[error("Agent reported an error: {0}")]
    Application(String),
}

/// Domain-level errors that can occur in taskmend.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Invalid state transition for task {task} from {from} to {to}")]
    InvalidStateTransition { task: TaskId, from: String, to: String },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Memory store error: {0}")]
    Memory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
