//! Task domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::role::AgentRole;
use crate::domain::errors::{DomainError, DomainResult};

/// Identifier of a task, unique within one plan. Rendered as `#N`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for TaskId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Lifecycle status of a task during one scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on dependencies.
    #[default]
    Pending,
    /// All dependencies succeeded; waiting for a concurrency slot.
    Ready,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    Failed,
    /// Never dispatched because a dependency failed.
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        }
    }

    /// Terminal states never change again within a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Blocked)
    }

    /// Whether the scheduler may move a task from `self` to `next`.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ready | Self::Blocked)
                | (Self::Ready, Self::Running | Self::Blocked)
                | (Self::Running, Self::Succeeded | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a task came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOrigin {
    /// Produced by the external planner.
    #[default]
    Planned,
    /// Produced by the repair planner to fix an earlier task.
    Repair {
        /// The original task this repair supersedes.
        repairs: TaskId,
        /// Objective of the mission that spawned the repair.
        origin_objective: String,
    },
}

/// A unit of work in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub agent_role: AgentRole,
    /// Instruction sent to the agent.
    pub description: String,
    /// Tasks that must succeed before this one runs.
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Retries consumed by the executor.
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub origin: TaskOrigin,
}

impl Task {
    /// Pending planned task with no dependencies.
    pub fn new(id: impl Into<TaskId>, agent_role: AgentRole, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_role,
            description: description.into(),
            dependencies: BTreeSet::new(),
            status: TaskStatus::Pending,
            retry_count: 0,
            origin: TaskOrigin::Planned,
        }
    }

    pub fn with_dependencies<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_origin(mut self, origin: TaskOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The original task id this task repairs, if it is a repair task.
    pub fn repairs(&self) -> Option<TaskId> {
        match &self.origin {
            TaskOrigin::Repair { repairs, .. } => Some(*repairs),
            TaskOrigin::Planned => None,
        }
    }

    /// Move the task to `next`, rejecting transitions the lifecycle forbids.
    pub fn transition_to(&mut self, next: TaskStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                task: self.id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}
