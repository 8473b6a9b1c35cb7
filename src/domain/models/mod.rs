//! Domain models: plans, tasks, results, quality gate types and configuration.

pub mod config;
pub mod execution;
pub mod lesson;
pub mod plan;
pub mod quality;
pub mod role;
pub mod task;

pub use config::{
    AgentProcessConfig, CircuitBreakerSettings, Config, ExecutorConfig, FailurePolicy,
    HealingConfig, LoggingConfig, MemoryConfig, QualityGateConfig, SchedulerConfig,
};
pub use execution::{content_hash, ExecutionResult, ResultSet};
pub use lesson::{LessonLearned, LESSONS_CATEGORY};
pub use plan::Plan;
pub use quality::{
    CheckOutcome, CheckerReport, GateContext, QualityGateResult, Severity, TaskEvidence,
    ValidationIssue,
};
pub use role::{AgentRole, RoleOverride, RoleProfile};
pub use task::{Task, TaskId, TaskOrigin, TaskStatus};
