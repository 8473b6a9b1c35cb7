//! Bounded executor: runs one task against the agent capability with a
//! timeout, a per-target circuit breaker and linear-backoff retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::AgentCallError;
use crate::domain::models::{
    content_hash, AgentRole, Config, ExecutionResult, ExecutorConfig, RoleProfile, Task,
};
use crate::domain::ports::{AgentCall, AgentReply, AgentRequest, SessionCache};
use crate::services::circuit_breaker::{
    with_circuit_breaker, CircuitBreakerError, CircuitBreakerService,
};

/// Longest agent text quoted in a log record.
const LOG_EXCERPT_CHARS: usize = 200;

/// Prefix of the executor's own per-attempt log records.
pub const ATTEMPT_LOG_PREFIX: &str = "attempt ";

/// Whether a log line was written by the executor rather than the agent.
pub fn is_attempt_record(line: &str) -> bool {
    line.starts_with(ATTEMPT_LOG_PREFIX)
}

/// Runtime settings for the bounded executor.
#[derive(Debug, Clone)]
pub struct BoundedExecutorConfig {
    /// Timeout for one agent call.
    pub task_timeout: Duration,
    /// Attempts before the task is reported failed (at least 1).
    pub max_attempts: u32,
    /// Attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
}

impl Default for BoundedExecutorConfig {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for BoundedExecutorConfig {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Resolved capability profile for every role.
#[derive(Debug, Clone)]
pub struct RoleProfiles(BTreeMap<AgentRole, RoleProfile>);

impl RoleProfiles {
    /// Built-in profiles with the configured role overrides applied.
    pub fn from_config(config: &Config) -> Self {
        Self(
            AgentRole::ALL
                .into_iter()
                .map(|role| (role, config.role_profile(role)))
                .collect(),
        )
    }

    pub fn get(&self, role: AgentRole) -> RoleProfile {
        self.0
            .get(&role)
            .cloned()
            .unwrap_or_else(|| role.default_profile())
    }
}

impl Default for RoleProfiles {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Executes single tasks. Knows nothing about the task graph.
pub struct BoundedExecutor {
    agent: Arc<dyn AgentCall>,
    breakers: Arc<CircuitBreakerService>,
    profiles: RoleProfiles,
    config: BoundedExecutorConfig,
    cache: Option<Arc<dyn SessionCache>>,
}

impl BoundedExecutor {
    pub fn new(
        agent: Arc<dyn AgentCall>,
        breakers: Arc<CircuitBreakerService>,
        config: BoundedExecutorConfig,
    ) -> Self {
        Self {
            agent,
            breakers,
            profiles: RoleProfiles::default(),
            config,
            cache: None,
        }
    }

    pub fn with_profiles(mut self, profiles: RoleProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    /// Reuse successful outputs for identical role + instruction pairs.
    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Capability profile used for `role`.
    pub fn profile(&self, role: AgentRole) -> RoleProfile {
        self.profiles.get(role)
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerService> {
        &self.breakers
    }

    fn cache_key(task: &Task) -> String {
        format!("{}:{}", task.agent_role, content_hash(&task.description))
    }

    /// Run `task` to a single result, retrying as configured.
    ///
    /// Never returns an error: every failure mode ends up in a failed result.
    #[instrument(skip(self, task), fields(task_id = %task.id, role = %task.agent_role))]
    pub async fn execute(&self, task: &Task) -> ExecutionResult {
        let started = Instant::now();
        let profile = self.profile(task.agent_role);
        let mut logs = Vec::new();

        if let Some(cache) = &self.cache {
            if let Some(output) = cache.get(&Self::cache_key(task)).await {
                debug!("Reusing cached result");
                logs.push(format!("Task {}: reused cached result", task.id));
                return ExecutionResult::succeeded(task.id, output, logs, 0)
                    .with_duration_ms(elapsed_ms(started));
            }
        }

        let mut attempts = 0;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                let delay = self.config.backoff * (attempt - 1);
                logs.push(format!(
                    "attempt {attempt}: retrying after {}ms backoff",
                    delay.as_millis()
                ));
                tokio::time::sleep(delay).await;
            }

            let request = AgentRequest {
                role: task.agent_role,
                instruction: task.description.clone(),
                model_hint: profile.model_hint.clone(),
                target: profile.target.clone(),
            };
            let timeout_secs = self.config.task_timeout.as_secs();
            let call = async {
                match timeout(self.config.task_timeout, self.agent.invoke(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AgentCallError::Timeout(timeout_secs)),
                }
            };

            let outcome =
                with_circuit_breaker(&self.breakers, &profile.target, |r: &AgentReply| !r.success, call)
                    .await;

            match outcome {
                Err(CircuitBreakerError::CircuitOpen { target, retry_after }) => {
                    warn!(target_key = %target, "Circuit open, failing task fast");
                    last_error = format!(
                        "Circuit breaker open for {target}, retry after {}s",
                        retry_after.as_secs()
                    );
                    logs.push(format!("attempt {attempt}: rejected, {last_error}"));
                    break;
                }
                Ok(reply) => {
                    attempts = attempt;
                    logs.extend(reply.raw_logs());
                    if reply.success {
                        logs.push(format!("attempt {attempt}: succeeded via {}", self.agent.name()));
                        info!(attempt, "Task succeeded");
                        if let Some(cache) = &self.cache {
                            cache.set(&Self::cache_key(task), reply.text.clone()).await;
                        }
                        return ExecutionResult::succeeded(task.id, reply.text, logs, attempts)
                            .with_duration_ms(elapsed_ms(started));
                    }
                    last_error = format!("Agent reported failure: {}", excerpt(&reply.text));
                    logs.push(format!("attempt {attempt}: failed: {}", excerpt(&reply.text)));
                    warn!(attempt, "Agent reported failure");
                }
                Err(CircuitBreakerError::OperationFailed(e)) => {
                    attempts = attempt;
                    match &e {
                        AgentCallError::Timeout(_) => warn!(attempt, "Agent call timed out"),
                        _ => warn!(attempt, error = %e, "Agent call failed"),
                    }
                    logs.push(format!("attempt {attempt}: error: {e}"));
                    last_error = e.to_string();
                }
            }
        }

        ExecutionResult::failed(task.id, last_error, logs, attempts).with_duration_ms(elapsed_ms(started))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= LOG_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(LOG_EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agents::{ScriptedAgent, ScriptedResponse};
    use crate::adapters::cache::InMemorySessionCache;
    use crate::services::circuit_breaker::{CircuitBreakerConfig, CircuitState};

    fn executor(agent: Arc<ScriptedAgent>, breakers: Arc<CircuitBreakerService>) -> BoundedExecutor {
        BoundedExecutor::new(
            agent,
            breakers,
            BoundedExecutorConfig {
                task_timeout: Duration::from_secs(5),
                max_attempts: 2,
                backoff: Duration::from_millis(100),
            },
        )
    }

    fn breakers(threshold: u32) -> Arc<CircuitBreakerService> {
        Arc::new(CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(60),
            enabled: true,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_succeed_logs_every_attempt() {
        let agent = ScriptedAgent::new().into_arc();
        agent
            .on("Build", [ScriptedResponse::error("flaky"), ScriptedResponse::success("built")])
            .await;

        let result = executor(agent.clone(), breakers(5))
            .execute(&Task::new(1, AgentRole::Coder, "Build the parser"))
            .await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.output, "built");
        assert!(result.logs.iter().any(|l| l.contains("attempt 1: error")));
        assert!(result.logs.iter().any(|l| l.contains("attempt 2: succeeded")));
        assert!(result.hash_matches());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_fail() {
        let agent = ScriptedAgent::new().into_arc();
        agent.on("Build", [ScriptedResponse::failure("compile error")]).await;

        let result = executor(agent.clone(), breakers(5))
            .execute(&Task::new(1, AgentRole::Coder, "Build it"))
            .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(agent.call_count("Build").await, 2);
        assert!(result.error.unwrap().contains("compile error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let agent = ScriptedAgent::new().into_arc();
        agent
            .on(
                "Slow",
                [ScriptedResponse::success("late").after(Duration::from_secs(30))],
            )
            .await;

        let result = executor(agent, breakers(5))
            .execute(&Task::new(1, AgentRole::Researcher, "Slow lookup"))
            .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.error.as_deref(), Some("Agent call timed out after 5s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_fails_fast_without_consuming_attempt() {
        let agent = ScriptedAgent::new().into_arc();
        let breakers = breakers(1);
        breakers.record_failure("model:coding", "down").await;
        assert_eq!(breakers.get_state("model:coding").await, Some(CircuitState::Open));

        let result = executor(agent.clone(), breakers)
            .execute(&Task::new(1, AgentRole::Coder, "Build it"))
            .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 0);
        assert!(agent.calls().await.is_empty());
        assert!(result.error.as_ref().unwrap().contains("Circuit breaker open"));
        assert!(!result.was_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_logs_are_captured() {
        let agent = ScriptedAgent::new().into_arc();
        agent
            .on(
                "Edit",
                [ScriptedResponse::success_with_logs(
                    "done",
                    &["write /etc/hosts: permission denied"],
                )],
            )
            .await;

        let result = executor(agent, breakers(5))
            .execute(&Task::new(1, AgentRole::Coder, "Edit hosts"))
            .await;

        assert!(result.success);
        assert_eq!(result.logs[0], "write /etc/hosts: permission denied");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_reuses_successful_output() {
        let agent = ScriptedAgent::new().into_arc();
        let cache = Arc::new(InMemorySessionCache::with_ttl(Duration::from_secs(60)));
        let executor = executor(agent.clone(), breakers(5)).with_cache(cache);
        let task = Task::new(1, AgentRole::Writer, "Summarise");

        let first = executor.execute(&task).await;
        let second = executor.execute(&task).await;

        assert_eq!(first.output, second.output);
        assert_eq!(second.attempts, 0);
        assert_eq!(agent.calls().await.len(), 1);
    }
}
