//! taskmend - execution-and-repair engine for multi-agent task plans
//!
//! Takes a plan (tasks with roles and dependencies), runs it through a
//! bounded pool of agent calls in dependency order, heals failed tasks with
//! generated repair tasks, and scores synthesized answers with a quality gate.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): validator, executor, scheduler, healing loop, quality gate
//! - **Adapters** (`adapters`): agent-call, memory and cache implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskmend::adapters::agents::ScriptedAgent;
//! use taskmend::domain::ports::NullMemoryStore;
//! use taskmend::{Config, MissionRunner, Plan};
//!
//! async fn run(plan: Plan) -> anyhow::Result<()> {
//!     let runner = MissionRunner::build(
//!         &Config::default(),
//!         Arc::new(ScriptedAgent::new()),
//!         Arc::new(NullMemoryStore::new()),
//!     );
//!     let report = runner.run(plan).await?;
//!     println!("success: {}", report.mission_success);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{AgentCallError, DomainError, DomainResult, PlanError};
pub use domain::models::{
    AgentRole, Config, ExecutionResult, GateContext, LessonLearned, Plan, QualityGateResult,
    Severity, Task, TaskId, TaskOrigin, TaskStatus, ValidationIssue,
};
pub use domain::ports::{AgentCall, AgentReply, AgentRequest, MemoryStore, SessionCache};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    GateVerdict, GraphScheduler, MissionReport, MissionRunner, PlanValidator,
    QualityGatePipeline, RepairPlanner, SelfHealingLoop,
};
