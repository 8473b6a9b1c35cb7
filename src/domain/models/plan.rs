//! Plan domain model: an objective plus the task graph produced for it.

use serde::{Deserialize, Serialize};

use super::task::{Task, TaskId};

/// A plan handed to the engine by an external planner.
///
/// Once a plan reaches the scheduler only task status and retry counts change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Natural-language objective the plan was produced for.
    pub objective: String,
    /// Optional classification hint from the planner (e.g. "coding", "research").
    #[serde(default)]
    pub classification: Option<String>,
    /// Ordered task list.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Empty plan for `objective`.
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            classification: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Task with the given id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Highest task id in the plan, or `#0` for an empty plan.
    pub fn max_task_id(&self) -> TaskId {
        self.tasks
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(TaskId(0))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
