//! Graph scheduler: runs a task graph under a global concurrency
//! cap, dispatching each task once all of its dependencies have succeeded.
//!
//! The scheduler loop is the single writer of task status. Dispatched tasks
//! run as spawned units of work holding concurrency permits; their results
//! come back through a `JoinSet` and are applied one at a time.

use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ExecutionResult, FailurePolicy, Plan, SchedulerConfig, Task, TaskId, TaskStatus,
};
use crate::services::bounded_executor::BoundedExecutor;
use crate::services::plan_validator::{PlanValidator, ValidatedPlan};

/// Event emitted during a scheduler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    /// A run began with this many tasks.
    RunStarted { total_tasks: usize },
    /// A task was dispatched; `running` counts tasks in flight, this one included.
    TaskStarted { task_id: TaskId, running: usize },
    /// A dispatched task reached a terminal state.
    TaskFinished { task_id: TaskId, success: bool, attempts: u32 },
    /// A task was never dispatched because `failed_dependency` did not succeed.
    TaskBlocked { task_id: TaskId, failed_dependency: TaskId },
    /// The run ended. `peak_running` is the most tasks that were ever in flight at once.
    RunFinished { succeeded: usize, failed: usize, blocked: usize, peak_running: usize },
}

/// Counts of terminal states after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// Tasks that were dispatched and failed.
    pub failed: usize,
    /// Tasks never dispatched because a dependency failed.
    pub blocked: usize,
}

impl RunSummary {
    /// Count the terminal states of `tasks`.
    pub fn of(tasks: &[Task]) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Succeeded => summary.succeeded += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Blocked => summary.blocked += 1,
                _ => {}
            }
        }
        summary
    }
}

/// Dependency-graph scheduler over a bounded executor.
pub struct GraphScheduler {
    executor: Arc<BoundedExecutor>,
    validator: PlanValidator,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
    events: Option<mpsc::Sender<ScheduleEvent>>,
}

type Completion = (TaskId, std::thread::Result<ExecutionResult>);

impl GraphScheduler {
    /// Scheduler over `executor` with the configured cap and failure policy.
    pub fn new(executor: Arc<BoundedExecutor>, config: &SchedulerConfig) -> Self {
        Self {
            executor,
            validator: PlanValidator::new(),
            max_concurrency: config.max_concurrency.max(1),
            failure_policy: config.failure_policy,
            events: None,
        }
    }

    /// Stream `ScheduleEvent`s to `sender`. Events are dropped when the
    /// channel is full; the scheduler never waits on a slow listener.
    pub fn with_event_sender(mut self, sender: mpsc::Sender<ScheduleEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Global cap on concurrency slots.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn executor(&self) -> &Arc<BoundedExecutor> {
        &self.executor
    }

    fn emit(&self, event: ScheduleEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.try_send(event);
        }
    }

    /// Run every task of `plan`, returning one result per task in plan order.
    ///
    /// An invalid plan is rejected before anything is dispatched.
    #[instrument(skip_all, fields(objective = %plan.objective, tasks = plan.tasks.len()))]
    pub async fn run(&self, plan: &mut Plan) -> DomainResult<Vec<ExecutionResult>> {
        let validated = self.validator.validate(plan)?;
        self.execute_validated(&mut plan.tasks, &validated).await
    }

    /// Run a bare task list (e.g. repair tasks) with the same guarantees as [`run`](Self::run).
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn run_tasks(&self, tasks: &mut [Task]) -> DomainResult<Vec<ExecutionResult>> {
        let validated = self.validator.validate_tasks(tasks)?;
        self.execute_validated(tasks, &validated).await
    }

    fn weight(&self, task: &Task) -> u32 {
        let cap = u32::try_from(self.max_concurrency).unwrap_or(u32::MAX);
        self.executor
            .profile(task.agent_role)
            .concurrency_weight
            .clamp(1, cap)
    }

    async fn execute_validated(
        &self,
        tasks: &mut [Task],
        validated: &ValidatedPlan,
    ) -> DomainResult<Vec<ExecutionResult>> {
        let index: HashMap<TaskId, usize> =
            tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut remaining: HashMap<TaskId, usize> = HashMap::new();
        for task in tasks.iter_mut() {
            if task.status != TaskStatus::Pending {
                debug!(task_id = %task.id, status = %task.status, "Resetting task to pending");
                task.status = TaskStatus::Pending;
            }
            remaining.insert(task.id, task.dependencies.len());
            for &dep in &task.dependencies {
                dependents.entry(dep).or_default().push(task.id);
            }
        }

        self.emit(ScheduleEvent::RunStarted { total_tasks: tasks.len() });
        info!(max_concurrency = self.max_concurrency, policy = ?self.failure_policy, "Scheduler run started");

        let mut ready: VecDeque<TaskId> = VecDeque::new();
        for &id in &validated.order {
            if remaining.get(&id) == Some(&0) {
                tasks[index[&id]].transition_to(TaskStatus::Ready)?;
                ready.push_back(id);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight: JoinSet<Completion> = JoinSet::new();
        let mut results: BTreeMap<usize, ExecutionResult> = BTreeMap::new();
        let mut running = 0usize;
        let mut peak_running = 0usize;

        loop {
            while let Some(&id) = ready.front() {
                let task = &mut tasks[index[&id]];
                let Ok(permit) = semaphore.clone().try_acquire_many_owned(self.weight(task)) else {
                    break;
                };
                ready.pop_front();
                task.transition_to(TaskStatus::Running)?;
                running += 1;
                peak_running = peak_running.max(running);
                debug!(task_id = %id, role = %task.agent_role, running, "Dispatching task");
                self.emit(ScheduleEvent::TaskStarted { task_id: id, running });

                let executor = Arc::clone(&self.executor);
                let snapshot = task.clone();
                in_flight.spawn(async move {
                    let _permit = permit;
                    let outcome = AssertUnwindSafe(executor.execute(&snapshot))
                        .catch_unwind()
                        .await;
                    (snapshot.id, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (id, outcome) = joined.map_err(|e| {
                DomainError::ExecutionFailed(format!("Scheduled task was cancelled: {e}"))
            })?;
            running -= 1;

            let result = outcome.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(task_id = %id, panic = %message, "Task panicked during execution");
                ExecutionResult::failed(
                    id,
                    format!("Task panicked: {message}"),
                    vec![format!("attempt 1: panicked: {message}")],
                    1,
                )
            });

            let task = &mut tasks[index[&id]];
            task.retry_count = result.attempts.saturating_sub(1);
            let success = result.success;
            if success {
                task.transition_to(TaskStatus::Succeeded)?;
                info!(task_id = %id, attempts = result.attempts, "Task succeeded");
            } else {
                task.transition_to(TaskStatus::Failed)?;
                warn!(task_id = %id, attempts = result.attempts, error = ?result.error, "Task failed");
            }
            self.emit(ScheduleEvent::TaskFinished {
                task_id: id,
                success,
                attempts: result.attempts,
            });
            results.insert(index[&id], result);

            if success || self.failure_policy == FailurePolicy::SkipAndContinue {
                for &next in dependents.get(&id).map(Vec::as_slice).unwrap_or_default() {
                    let Some(count) = remaining.get_mut(&next) else { continue };
                    *count -= 1;
                    let next_task = &mut tasks[index[&next]];
                    if *count == 0 && next_task.status == TaskStatus::Pending {
                        next_task.transition_to(TaskStatus::Ready)?;
                        ready.push_back(next);
                    }
                }
            } else {
                for (blocked, cause) in Self::block_dependents(tasks, &index, &dependents, id)? {
                    warn!(task_id = %blocked, failed_dependency = %cause, "Task blocked");
                    self.emit(ScheduleEvent::TaskBlocked {
                        task_id: blocked,
                        failed_dependency: cause,
                    });
                    results.insert(index[&blocked], ExecutionResult::blocked(blocked, cause));
                }
            }
        }

        let summary = RunSummary::of(tasks);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            blocked = summary.blocked,
            peak_running,
            "Scheduler run finished"
        );
        self.emit(ScheduleEvent::RunFinished {
            succeeded: summary.succeeded,
            failed: summary.failed,
            blocked: summary.blocked,
            peak_running,
        });

        Ok(results.into_values().collect())
    }

    /// Block every not-yet-terminal transitive dependent of `failed`.
    /// Returns `(blocked, direct cause)` pairs in breadth-first order.
    fn block_dependents(
        tasks: &mut [Task],
        index: &HashMap<TaskId, usize>,
        dependents: &HashMap<TaskId, Vec<TaskId>>,
        failed: TaskId,
    ) -> DomainResult<Vec<(TaskId, TaskId)>> {
        let mut blocked = Vec::new();
        let mut queue = VecDeque::from([failed]);
        while let Some(cause) = queue.pop_front() {
            for &next in dependents.get(&cause).map(Vec::as_slice).unwrap_or_default() {
                let task = &mut tasks[index[&next]];
                if task.status.is_terminal() {
                    continue;
                }
                task.transition_to(TaskStatus::Blocked)?;
                blocked.push((next, cause));
                queue.push_back(next);
            }
        }
        Ok(blocked)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
