//! Integration tests for the self-healing loop: execution, repair, lessons.

mod common;

use std::sync::Arc;

use common::{scheduler, setup_test_logging, task};
use taskmend::adapters::agents::{ScriptedAgent, ScriptedResponse};
use taskmend::adapters::memory::JsonlMemoryStore;
use taskmend::domain::models::{AgentRole, FailurePolicy, Plan, TaskId, LESSONS_CATEGORY};
use taskmend::domain::ports::MemoryStore;
use taskmend::services::SelfHealingLoop;
use tempfile::TempDir;

fn jsonl_healer(agent: Arc<ScriptedAgent>, dir: &TempDir) -> SelfHealingLoop {
    let scheduler = scheduler(agent, 4, FailurePolicy::BlockDependents);
    SelfHealingLoop::new(Arc::new(scheduler), Arc::new(JsonlMemoryStore::new(dir.path())))
}

#[tokio::test]
async fn test_error_in_logs_of_successful_task_is_repaired_and_lesson_persisted() {
    setup_test_logging();
    let dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new().into_arc();
    agent
        .on(
            "Write the config file",
            [ScriptedResponse::success_with_logs(
                "config written",
                &["Error: permission denied writing /etc/app.conf"],
            )],
        )
        .await;
    agent
        .on("Repair task", [ScriptedResponse::success("wrote ./app.conf instead")])
        .await;

    let mut plan = Plan::new("Configure the app")
        .with_task(task(1, AgentRole::Coder, "Write the config file", &[]));
    let healer = jsonl_healer(agent.clone(), &dir);
    let initial = healer.scheduler().run(&mut plan).await.unwrap();
    assert!(initial[0].success, "the call itself succeeded");

    let outcome = healer.heal(&plan, initial, 2).await;

    assert!(outcome.success);
    assert_eq!(outcome.repair_cycles, 1);
    assert_eq!(outcome.final_results[0].task_id, TaskId(1));
    assert_eq!(outcome.final_results[0].repaired_by, Some(TaskId(2)));
    assert_eq!(outcome.final_results[0].output, "wrote ./app.conf instead");

    let repair_call = agent
        .calls()
        .await
        .into_iter()
        .find(|c| c.instruction.starts_with("Repair task #2 for task #1"))
        .expect("repair task dispatched");
    assert!(repair_call.instruction.contains("permission denied"));

    // A fresh store over the same directory sees the lesson.
    let reopened = JsonlMemoryStore::new(dir.path());
    let lessons = reopened.list(LESSONS_CATEGORY).await.unwrap();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].objective, "Configure the app");
    assert!(lessons[0].solution.contains("#2"));
}

#[tokio::test]
async fn test_second_cycle_fixes_what_first_could_not() {
    let dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new().into_arc();
    agent.on("Fetch the dataset", [ScriptedResponse::error("connection reset")]).await;
    agent
        .on(
            "Repair task",
            [
                ScriptedResponse::error("mirror unreachable"),
                ScriptedResponse::success("dataset fetched from backup mirror"),
            ],
        )
        .await;

    let mut plan = Plan::new("Train the model")
        .with_task(task(1, AgentRole::Researcher, "Fetch the dataset", &[]));
    let healer = jsonl_healer(agent.clone(), &dir);
    let initial = healer.scheduler().run(&mut plan).await.unwrap();

    let outcome = healer.heal(&plan, initial, 3).await;

    assert!(outcome.success);
    assert_eq!(outcome.repair_cycles, 2);
    assert_eq!(outcome.final_results[0].repaired_by, Some(TaskId(3)));
    // Original failure plus one result per cycle.
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(outcome.lessons_recorded, 1, "only the cycle that fixed something teaches");
    assert_eq!(agent.call_count("Repair task #3 for task #1").await, 1);
}

#[tokio::test]
async fn test_blocked_dependent_repair_waits_for_its_cause() {
    let dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new().into_arc();
    agent.on("Compile", [ScriptedResponse::error("linker not found")]).await;

    let mut plan = Plan::new("Build").with_tasks([
        task(1, AgentRole::Coder, "Compile", &[]),
        task(2, AgentRole::Tester, "Run the test suite", &[1]),
    ]);
    let healer = jsonl_healer(agent.clone(), &dir);
    let initial = healer.scheduler().run(&mut plan).await.unwrap();
    assert_eq!(initial[1].blocked_by, Some(TaskId(1)));

    let outcome = healer.heal(&plan, initial, 1).await;
    assert!(outcome.success);

    let repair_calls: Vec<String> = agent
        .calls()
        .await
        .into_iter()
        .map(|c| c.instruction)
        .filter(|i| i.starts_with("Repair task"))
        .collect();
    assert_eq!(repair_calls.len(), 2);
    assert!(repair_calls[0].starts_with("Repair task #3 for task #1"));
    assert!(repair_calls[1].starts_with("Repair task #4 for task #2"));
    assert_eq!(outcome.final_results[1].repaired_by, Some(TaskId(4)));
}
