//! Property tests for plan validation and dependency-ordered execution.

mod common;

use std::collections::{BTreeSet, HashMap};

use common::{scheduler, task};
use proptest::prelude::*;
use taskmend::adapters::agents::{ScriptedAgent, ScriptedResponse};
use taskmend::domain::models::{AgentRole, FailurePolicy, Plan, TaskId, TaskStatus};
use taskmend::services::PlanValidator;
use taskmend::PlanError;

/// Random acyclic plans: task `i` may only depend on tasks with smaller ids.
fn acyclic_plan() -> impl Strategy<Value = Plan> {
    prop::collection::vec(prop::collection::vec(any::<u32>(), 0..4), 1..16).prop_map(|raw| {
        let tasks = raw.iter().enumerate().map(|(i, picks)| {
            let id = u32::try_from(i).unwrap() + 1;
            let deps: BTreeSet<u32> = if id == 1 {
                BTreeSet::new()
            } else {
                picks.iter().map(|p| p % (id - 1) + 1).collect()
            };
            let deps: Vec<u32> = deps.into_iter().collect();
            task(id, AgentRole::Writer, &format!("Step {id}:"), &deps)
        });
        Plan::new("generated").with_tasks(tasks)
    })
}

proptest! {
    /// Every dependency precedes its dependents, and depth is one more
    /// than the deepest dependency.
    #[test]
    fn prop_order_respects_dependencies(plan in acyclic_plan()) {
        let validated = PlanValidator::new().validate(&plan).unwrap();
        prop_assert_eq!(validated.order.len(), plan.len());

        let position: HashMap<TaskId, usize> =
            validated.order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        for t in &plan.tasks {
            for dep in &t.dependencies {
                prop_assert!(position[dep] < position[&t.id], "{} before {}", dep, t.id);
            }
            let expected = t
                .dependencies
                .iter()
                .map(|d| validated.depth[d] + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(validated.depth[&t.id], expected);
        }

        let wave_total: usize = validated.waves().iter().map(Vec::len).sum();
        prop_assert_eq!(wave_total, plan.len());
    }

    /// Closing a chain back onto its first task is always caught.
    #[test]
    fn prop_back_edge_is_a_cycle(plan in acyclic_plan(), extra in 2u32..6) {
        let base = u32::try_from(plan.len()).unwrap();
        let n = base + extra;
        let mut tasks = plan.tasks.clone();
        // Chain base+1 -> 1, then each link on the previous one.
        for id in (base + 1)..=n {
            let dep = if id == base + 1 { 1 } else { id - 1 };
            tasks.push(task(id, AgentRole::Coder, &format!("Chain {id}"), &[dep]));
        }
        tasks[0].dependencies.insert(TaskId(n));
        let plan = Plan::new("cyclic").with_tasks(tasks);

        match PlanValidator::new().validate(&plan) {
            Err(PlanError::DependencyCycle(path)) => prop_assert!(path.len() >= 2),
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// A task runs iff all its dependencies succeeded; everything else
    /// downstream of a failure is blocked and never dispatched.
    #[test]
    fn prop_failures_block_exactly_their_descendants(
        plan in acyclic_plan(),
        failing in prop::collection::btree_set(1u32..16, 0..3),
    ) {
        let mut plan = plan;
        let failing: BTreeSet<TaskId> = failing.into_iter().map(TaskId).collect();

        let (results, called) = tokio_test::block_on(async {
            let agent = ScriptedAgent::new().into_arc();
            for id in &failing {
                agent.on(format!("Step {}:", id.0), [ScriptedResponse::error("boom")]).await;
            }
            let results = scheduler(agent.clone(), 3, FailurePolicy::BlockDependents)
                .run(&mut plan)
                .await
                .unwrap();
            let called: BTreeSet<String> =
                agent.calls().await.into_iter().map(|c| c.instruction).collect();
            (results, called)
        });

        prop_assert_eq!(results.len(), plan.len());
        let status: HashMap<TaskId, TaskStatus> = plan.tasks.iter().map(|t| (t.id, t.status)).collect();
        for t in &plan.tasks {
            let deps_ok = t.dependencies.iter().all(|d| status[d] == TaskStatus::Succeeded);
            let was_called = called.contains(&t.description);
            prop_assert_eq!(was_called, deps_ok, "{}", t.id);
            let expected = match (deps_ok, failing.contains(&t.id)) {
                (false, _) => TaskStatus::Blocked,
                (true, true) => TaskStatus::Failed,
                (true, false) => TaskStatus::Succeeded,
            };
            prop_assert_eq!(status[&t.id], expected, "{}", t.id);
        }
    }
}
