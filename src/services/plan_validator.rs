//! Structural validation of plans before any task is dispatched.

use std::collections::{btree_set, BTreeMap, BTreeSet, VecDeque};

use crate::domain::errors::PlanError;
use crate::domain::models::{Plan, Task, TaskId};

/// A plan that passed validation, with its dependency ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    /// Task ids with every dependency before its dependents.
    pub order: Vec<TaskId>,
    /// Longest dependency chain below each task (roots are 0).
    pub depth: BTreeMap<TaskId, u32>,
}

impl ValidatedPlan {
    /// Tasks grouped by depth; each group can run concurrently.
    pub fn waves(&self) -> Vec<Vec<TaskId>> {
        let mut waves: Vec<Vec<TaskId>> = Vec::new();
        for (&id, &d) in &self.depth {
            let d = d as usize;
            if waves.len() <= d {
                waves.resize_with(d + 1, Vec::new);
            }
            waves[d].push(id);
        }
        waves
    }
}

/// Validates plan structure and orders the task graph.
#[derive(Debug, Clone, Default)]
pub struct PlanValidator;

static NO_DEPENDENCIES: BTreeSet<TaskId> = BTreeSet::new();

type DependencyGraph<'a> = BTreeMap<TaskId, &'a BTreeSet<TaskId>>;

fn dependencies_of<'a>(graph: &DependencyGraph<'a>, id: TaskId) -> btree_set::Iter<'a, TaskId> {
    graph.get(&id).copied().unwrap_or(&NO_DEPENDENCIES).iter()
}

// Iterative depth-first search; `path` mirrors the explicit stack.
fn find_cycle_from(
    root: TaskId,
    graph: &DependencyGraph<'_>,
    visited: &mut BTreeSet<TaskId>,
) -> Option<Vec<TaskId>> {
    let mut on_stack = BTreeSet::from([root]);
    let mut path = vec![root];
    let mut stack = vec![dependencies_of(graph, root)];
    visited.insert(root);

    while let Some(deps) = stack.last_mut() {
        let Some(&dep) = deps.next() else {
            stack.pop();
            if let Some(done) = path.pop() {
                on_stack.remove(&done);
            }
            continue;
        };
        if on_stack.contains(&dep) {
            let start = path.iter().position(|&id| id == dep).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(dep);
            return Some(cycle);
        }
        if visited.insert(dep) {
            on_stack.insert(dep);
            path.push(dep);
            stack.push(dependencies_of(graph, dep));
        }
    }
    None
}

impl PlanValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a whole plan, objective included.
    pub fn validate(&self, plan: &Plan) -> Result<ValidatedPlan, PlanError> {
        if plan.objective.trim().is_empty() {
            return Err(PlanError::EmptyObjective);
        }
        self.validate_tasks(&plan.tasks)
    }

    /// Validate a task list: unique ids, known non-self dependencies,
    /// non-empty descriptions and an acyclic dependency relation.
    pub fn validate_tasks(&self, tasks: &[Task]) -> Result<ValidatedPlan, PlanError> {
        let mut ids = BTreeSet::new();
        for task in tasks {
            if !ids.insert(task.id) {
                return Err(PlanError::DuplicateTaskId(task.id));
            }
        }

        for task in tasks {
            if task.description.trim().is_empty() {
                return Err(PlanError::EmptyDescription(task.id));
            }
            for &dep in &task.dependencies {
                if dep == task.id {
                    return Err(PlanError::SelfDependency(task.id));
                }
                if !ids.contains(&dep) {
                    return Err(PlanError::UnknownDependency {
                        task: task.id,
                        dependency: dep,
                    });
                }
            }
        }

        if let Some(cycle) = Self::detect_cycle(tasks) {
            return Err(PlanError::DependencyCycle(cycle));
        }

        Ok(Self::order(tasks))
    }

    /// First dependency cycle found, as a closed path (`a -> b -> a`).
    pub fn detect_cycle(tasks: &[Task]) -> Option<Vec<TaskId>> {
        let graph: DependencyGraph<'_> = tasks.iter().map(|t| (t.id, &t.dependencies)).collect();

        let mut visited = BTreeSet::new();
        for &id in graph.keys() {
            if visited.contains(&id) {
                continue;
            }
            if let Some(cycle) = find_cycle_from(id, &graph, &mut visited) {
                return Some(cycle);
            }
        }
        None
    }

    // Kahn's algorithm over an acyclic graph with known dependencies.
    fn order(tasks: &[Task]) -> ValidatedPlan {
        let mut in_degree: BTreeMap<TaskId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();

        for task in tasks {
            in_degree.insert(task.id, task.dependencies.len());
            for &dep in &task.dependencies {
                dependents.entry(dep).or_default().push(task.id);
            }
        }

        let mut queue: VecDeque<TaskId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut depth: BTreeMap<TaskId, u32> = queue.iter().map(|&id| (id, 0)).collect();
        let mut order = Vec::with_capacity(tasks.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let here = depth.get(&id).copied().unwrap_or(0);
            for &next in dependents.get(&id).map(Vec::as_slice).unwrap_or_default() {
                let d = depth.entry(next).or_insert(0);
                *d = (*d).max(here + 1);
                if let Some(remaining) = in_degree.get_mut(&next) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        ValidatedPlan { order, depth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentRole;

    fn task(id: u32, deps: &[u32]) -> Task {
        Task::new(id, AgentRole::Coder, format!("task {id}")).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_linear_chain_orders_dependencies_first() {
        let tasks = vec![task(3, &[2]), task(1, &[]), task(2, &[1])];
        let validated = PlanValidator::new().validate_tasks(&tasks).unwrap();
        assert_eq!(validated.order, vec![TaskId(1), TaskId(2), TaskId(3)]);
        assert_eq!(validated.depth[&TaskId(3)], 2);
    }

    #[test]
    fn test_diamond_waves() {
        let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[1]), task(4, &[2, 3])];
        let validated = PlanValidator::new().validate_tasks(&tasks).unwrap();
        assert_eq!(
            validated.waves(),
            vec![vec![TaskId(1)], vec![TaskId(2), TaskId(3)], vec![TaskId(4)]]
        );
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let tasks = vec![task(1, &[3]), task(2, &[1]), task(3, &[2])];
        let err = PlanValidator::new().validate_tasks(&tasks).unwrap_err();
        match err {
            PlanError::DependencyCycle(path) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_very_long_chain_does_not_exhaust_the_stack() {
        let len = 200_000;
        let mut tasks: Vec<Task> = (1..=len)
            .map(|id| if id == 1 { task(1, &[]) } else { task(id, &[id - 1]) })
            .collect();
        let validated = PlanValidator::new().validate_tasks(&tasks).unwrap();
        assert_eq!(validated.depth[&TaskId(len)], len - 1);

        tasks[0].dependencies.insert(TaskId(len));
        match PlanValidator::new().validate_tasks(&tasks).unwrap_err() {
            PlanError::DependencyCycle(path) => assert_eq!(path.len(), len as usize + 1),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = PlanValidator::new().validate_tasks(&[task(1, &[1])]).unwrap_err();
        assert_eq!(err, PlanError::SelfDependency(TaskId(1)));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = PlanValidator::new().validate_tasks(&[task(1, &[9])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                task: TaskId(1),
                dependency: TaskId(9)
            }
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = PlanValidator::new()
            .validate_tasks(&[task(1, &[]), task(1, &[])])
            .unwrap_err();
        assert_eq!(err, PlanError::DuplicateTaskId(TaskId(1)));
    }

    #[test]
    fn test_empty_objective_rejected() {
        let plan = Plan::new("  ").with_task(task(1, &[]));
        assert_eq!(PlanValidator::new().validate(&plan).unwrap_err(), PlanError::EmptyObjective);
    }

    #[test]
    fn test_empty_plan_is_valid() {
        let validated = PlanValidator::new().validate(&Plan::new("noop")).unwrap();
        assert!(validated.order.is_empty());
        assert!(validated.waves().is_empty());
    }
}
