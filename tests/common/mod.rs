//! Common test utilities for integration tests
//!
//! Shared fixtures for building schedulers, healing loops and mission
//! runners over a scripted agent.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use taskmend::adapters::agents::ScriptedAgent;
use taskmend::adapters::memory::InMemoryMemoryStore;
use taskmend::domain::models::{AgentRole, Config, FailurePolicy, SchedulerConfig, Task};
use taskmend::services::{
    BoundedExecutor, BoundedExecutorConfig, CircuitBreakerService, GraphScheduler, MissionRunner,
    SelfHealingLoop,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Executor settings that keep tests fast: one attempt, tiny backoff.
pub fn fast_executor_config() -> BoundedExecutorConfig {
    BoundedExecutorConfig {
        task_timeout: Duration::from_secs(30),
        max_attempts: 1,
        backoff: Duration::from_millis(1),
    }
}

pub fn scheduler(agent: Arc<ScriptedAgent>, max_concurrency: usize, policy: FailurePolicy) -> GraphScheduler {
    let executor = BoundedExecutor::new(
        agent,
        Arc::new(CircuitBreakerService::with_defaults()),
        fast_executor_config(),
    );
    GraphScheduler::new(
        Arc::new(executor),
        &SchedulerConfig {
            max_concurrency,
            failure_policy: policy,
        },
    )
}

pub fn healer(agent: Arc<ScriptedAgent>, memory: Arc<InMemoryMemoryStore>) -> SelfHealingLoop {
    let scheduler = scheduler(agent, 4, FailurePolicy::BlockDependents);
    SelfHealingLoop::new(Arc::new(scheduler), memory)
}

/// Default configuration with retries and backoff turned down.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.executor.max_attempts = 1;
    config.executor.backoff_ms = 1;
    config
}

pub fn mission(agent: Arc<ScriptedAgent>, memory: Arc<InMemoryMemoryStore>) -> MissionRunner {
    MissionRunner::build(&fast_config(), agent, memory)
}

/// A task whose description is `"{description}"` with the given dependencies.
pub fn task(id: u32, role: AgentRole, description: &str, deps: &[u32]) -> Task {
    Task::new(id, role, description).with_dependencies(deps.iter().copied())
}
