//! Mission runner: graph execution, self-healing and the quality gate wired together.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::adapters::cache::InMemorySessionCache;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Config, ExecutionResult, GateContext, Plan, QualityGateResult};
use crate::domain::ports::{AgentCall, MemoryStore};
use crate::services::bounded_executor::{BoundedExecutor, BoundedExecutorConfig, RoleProfiles};
use crate::services::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerService};
use crate::services::graph_scheduler::{GraphScheduler, ScheduleEvent};
use crate::services::quality_gate::QualityGatePipeline;
use crate::services::repair_planner::is_erroneous;
use crate::services::self_healing::SelfHealingLoop;

/// Everything a mission produced, ready for synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub objective: String,
    /// The plan with final task statuses.
    pub plan: Plan,
    /// Latest result per planned task, in plan order.
    pub final_results: Vec<ExecutionResult>,
    /// Every final result succeeded.
    pub mission_success: bool,
    /// Repair cycles consumed.
    pub repair_cycles: u32,
    /// Self-healing was skipped for a single clean task.
    pub phase_c_skipped: bool,
    /// Every result recorded, superseded ones included.
    pub history: Vec<ExecutionResult>,
}

/// Gate decision on a synthesized candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "verdict", content = "result", rename_all = "snake_case")]
pub enum GateVerdict {
    /// The candidate passed the gate.
    Accepted(QualityGateResult),
    /// The candidate failed the gate and should be synthesized again.
    NeedsResynthesis(QualityGateResult),
}

impl GateVerdict {
    /// The gate result behind this verdict.
    pub const fn result(&self) -> &QualityGateResult {
        match self {
            Self::Accepted(r) | Self::NeedsResynthesis(r) => r,
        }
    }

    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Runs a plan end to end: schedule, heal, then review candidates.
pub struct MissionRunner {
    scheduler: Arc<GraphScheduler>,
    healer: SelfHealingLoop,
    gate: QualityGatePipeline,
    max_cycles: u32,
    short_circuit: bool,
}

impl MissionRunner {
    /// Wire every component from `config`.
    pub fn build(config: &Config, agent: Arc<dyn AgentCall>, memory: Arc<dyn MemoryStore>) -> Self {
        Self::assemble(config, agent, memory, None)
    }

    /// Like [`build`](Self::build), streaming scheduler events to `events`.
    pub fn build_with_events(
        config: &Config,
        agent: Arc<dyn AgentCall>,
        memory: Arc<dyn MemoryStore>,
        events: mpsc::Sender<ScheduleEvent>,
    ) -> Self {
        Self::assemble(config, agent, memory, Some(events))
    }

    fn assemble(
        config: &Config,
        agent: Arc<dyn AgentCall>,
        memory: Arc<dyn MemoryStore>,
        events: Option<mpsc::Sender<ScheduleEvent>>,
    ) -> Self {
        let breakers = Arc::new(CircuitBreakerService::new(CircuitBreakerConfig::from(
            &config.circuit_breaker,
        )));
        let mut executor = BoundedExecutor::new(
            agent,
            breakers,
            BoundedExecutorConfig::from(&config.executor),
        )
        .with_profiles(RoleProfiles::from_config(config));
        if config.executor.result_cache_ttl_secs > 0 {
            let ttl = Duration::from_secs(config.executor.result_cache_ttl_secs);
            executor = executor.with_cache(Arc::new(InMemorySessionCache::with_ttl(ttl)));
        }

        let mut scheduler = GraphScheduler::new(Arc::new(executor), &config.scheduler);
        if let Some(events) = events {
            scheduler = scheduler.with_event_sender(events);
        }
        let scheduler = Arc::new(scheduler);

        Self {
            healer: SelfHealingLoop::new(Arc::clone(&scheduler), memory),
            scheduler,
            gate: QualityGatePipeline::with_default_checkers(config.quality_gate.clone()),
            max_cycles: config.healing.max_cycles,
            short_circuit: config.healing.short_circuit_single_task,
        }
    }

    pub const fn gate(&self) -> &QualityGatePipeline {
        &self.gate
    }

    /// Execute `plan` and heal its failures.
    ///
    /// Only an invalid plan is an error; failed work is reported in the
    /// returned report.
    #[instrument(skip_all, fields(objective = %plan.objective, tasks = plan.len()))]
    pub async fn run(&self, mut plan: Plan) -> DomainResult<MissionReport> {
        let results = self.scheduler.run(&mut plan).await?;

        let clean_single = plan.len() == 1 && results.iter().all(|r| !is_erroneous(r));
        if self.short_circuit && clean_single {
            info!("Single clean task, skipping self-healing");
            return Ok(MissionReport {
                objective: plan.objective.clone(),
                history: results.clone(),
                final_results: results,
                plan,
                mission_success: true,
                repair_cycles: 0,
                phase_c_skipped: true,
            });
        }

        let outcome = self.healer.heal(&plan, results, self.max_cycles).await;
        info!(
            mission_success = outcome.success,
            repair_cycles = outcome.repair_cycles,
            "Mission finished"
        );
        Ok(MissionReport {
            objective: plan.objective.clone(),
            plan,
            final_results: outcome.final_results,
            mission_success: outcome.success,
            repair_cycles: outcome.repair_cycles,
            phase_c_skipped: false,
            history: outcome.history,
        })
    }

    /// Gate a synthesized `candidate` against the mission's evidence.
    pub fn review(
        &self,
        candidate: &str,
        report: &MissionReport,
        prior_responses: impl IntoIterator<Item = String>,
    ) -> GateVerdict {
        let ctx = GateContext::from_results(&report.final_results).with_prior_responses(prior_responses);
        let result = self.gate.evaluate(candidate, &ctx);
        if result.passed {
            GateVerdict::Accepted(result)
        } else {
            GateVerdict::NeedsResynthesis(result)
        }
    }
}
