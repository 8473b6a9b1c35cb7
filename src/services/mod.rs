//! Execution-and-repair engine.

pub mod bounded_executor;
pub mod circuit_breaker;
pub mod graph_scheduler;
pub mod mission;
pub mod plan_validator;
pub mod quality_gate;
pub mod repair_planner;
pub mod self_healing;

pub use bounded_executor::{BoundedExecutor, BoundedExecutorConfig, RoleProfiles};
pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerService, CircuitState};
pub use graph_scheduler::{GraphScheduler, RunSummary, ScheduleEvent};
pub use mission::{GateVerdict, MissionReport, MissionRunner};
pub use plan_validator::{PlanValidator, ValidatedPlan};
pub use quality_gate::{Checker, QualityGatePipeline};
pub use repair_planner::RepairPlanner;
pub use self_healing::{HealingOutcome, SelfHealingLoop};
