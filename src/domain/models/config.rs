//! Configuration model with serde defaults for every section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::role::{AgentRole, RoleOverride, RoleProfile};

/// Main configuration structure for taskmend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Graph scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Bounded executor configuration
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Per-target circuit breaker configuration
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,

    /// Self-healing loop configuration
    #[serde(default)]
    pub healing: HealingConfig,

    /// Quality gate configuration
    #[serde(default)]
    pub quality_gate: QualityGateConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Lesson memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// External agent process configuration
    #[serde(default)]
    pub agent: AgentProcessConfig,

    /// Per-role overrides, keyed by role name
    #[serde(default)]
    pub roles: BTreeMap<String, RoleOverride>,
}

impl Config {
    /// Resolve the profile for a role, applying any configured override.
    pub fn role_profile(&self, role: AgentRole) -> RoleProfile {
        let base = role.default_profile();
        match self.roles.get(role.as_str()) {
            Some(over) => base.with_override(over),
            None => base,
        }
    }
}

/// How a failed task affects its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Every transitive dependent of a failed task is blocked and never dispatched.
    #[default]
    BlockDependents,
    /// Dependents run once all dependencies are terminal, whatever the outcome.
    SkipAndContinue,
}

/// Graph scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running tasks (1-100)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Failure propagation policy
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

const fn default_max_concurrency() -> usize {
    8
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Bounded executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Timeout for a single agent call in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Attempts per task before it is reported failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds (attempt N waits N * backoff_ms)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Session cache TTL in seconds; 0 disables result reuse
    #[serde(default)]
    pub result_cache_ttl_secs: u64,
}

const fn default_task_timeout_secs() -> u64 {
    300
}

const fn default_max_attempts() -> u32 {
    2
}

const fn default_backoff_ms() -> u64 {
    1000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: default_task_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            result_cache_ttl_secs: 0,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitBreakerSettings {
    /// Whether breakers are consulted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures that open a breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open breaker waits before allowing a trial call
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_cooldown_secs() -> u64 {
    60
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// Self-healing loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HealingConfig {
    /// Maximum repair cycles per mission
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// Skip healing for a single task that already succeeded cleanly
    #[serde(default = "default_true")]
    pub short_circuit_single_task: bool,
}

const fn default_max_cycles() -> u32 {
    1
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            short_circuit_single_task: true,
        }
    }
}

/// Quality gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QualityGateConfig {
    /// Minimum score to pass (0-100)
    #[serde(default = "default_gate_threshold")]
    pub threshold: u8,

    /// Use `strict_threshold` instead of `threshold`
    #[serde(default)]
    pub strict: bool,

    /// Minimum score to pass in strict mode (0-100)
    #[serde(default = "default_strict_threshold")]
    pub strict_threshold: u8,

    /// Fixed penalty applied when a checker errors or panics
    #[serde(default = "default_checker_failure_penalty")]
    pub checker_failure_penalty: u8,

    /// Similarity to a prior response that is treated as an error
    #[serde(default = "default_duplicate_error_similarity")]
    pub duplicate_error_similarity: f64,

    /// Similarity to a prior response that is treated as a warning
    #[serde(default = "default_duplicate_warning_similarity")]
    pub duplicate_warning_similarity: f64,
}

const fn default_gate_threshold() -> u8 {
    60
}

const fn default_strict_threshold() -> u8 {
    80
}

const fn default_checker_failure_penalty() -> u8 {
    5
}

const fn default_duplicate_error_similarity() -> f64 {
    0.9
}

const fn default_duplicate_warning_similarity() -> f64 {
    0.7
}

impl QualityGateConfig {
    /// Threshold in effect, honouring strict mode.
    pub const fn effective_threshold(&self) -> u8 {
        if self.strict {
            self.strict_threshold
        } else {
            self.threshold
        }
    }
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            threshold: default_gate_threshold(),
            strict: false,
            strict_threshold: default_strict_threshold(),
            checker_failure_penalty: default_checker_failure_penalty(),
            duplicate_error_similarity: default_duplicate_error_similarity(),
            duplicate_warning_similarity: default_duplicate_warning_similarity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Lesson memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Persist lessons learned by the self-healing loop
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding one JSONL file per category
    #[serde(default = "default_memory_directory")]
    pub directory: String,
}

fn default_memory_directory() -> String {
    ".taskmend/memory".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_memory_directory(),
        }
    }
}

/// External agent process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentProcessConfig {
    /// Program invoked once per agent call
    #[serde(default = "default_agent_program")]
    pub program: String,

    /// Arguments placed before the instruction
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_agent_program() -> String {
    "claude".to_string()
}

impl Default for AgentProcessConfig {
    fn default() -> Self {
        Self {
            program: default_agent_program(),
            args: vec!["--print".to_string()],
        }
    }
}
