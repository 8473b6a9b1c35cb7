//! Quality gate pipeline.
//!
//! Runs every registered [`Checker`] against a candidate response and folds
//! their contributions into a single score. Checkers are isolated from one
//! another: an error or panic in one is recorded as a warning with a small
//! fixed penalty and the remaining checkers still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use super::{
    CitationChecker, Checker, CoherenceChecker, DuplicateChecker, FabricationChecker,
    GroundingChecker, InjectionChecker, IntegrityChecker,
};
use crate::domain::models::{
    CheckOutcome, CheckerReport, GateContext, QualityGateConfig, QualityGateResult, Severity,
    ValidationIssue,
};

const MAX_SCORE: i32 = 100;

// ---------------------------------------------------------------------------
// QualityGatePipeline
// ---------------------------------------------------------------------------

/// Ordered collection of checkers plus the scoring policy.
pub struct QualityGatePipeline {
    checkers: Vec<Box<dyn Checker>>,
    config: QualityGateConfig,
}

impl std::fmt::Debug for QualityGatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGatePipeline")
            .field("checkers", &self.checker_names())
            .field("config", &self.config)
            .finish()
    }
}

impl QualityGatePipeline {
    /// Create a pipeline with no checkers.
    pub fn new(config: QualityGateConfig) -> Self {
        Self {
            checkers: Vec::new(),
            config,
        }
    }

    /// Create a pipeline with the seven built-in checkers.
    pub fn with_default_checkers(config: QualityGateConfig) -> Self {
        let duplicate = DuplicateChecker::from_config(&config);
        let mut pipeline = Self::new(config);
        pipeline.add(Box::new(FabricationChecker::new()));
        pipeline.add(Box::new(GroundingChecker::new()));
        pipeline.add(Box::new(duplicate));
        pipeline.add(Box::new(CitationChecker::new()));
        pipeline.add(Box::new(CoherenceChecker::new()));
        pipeline.add(Box::new(IntegrityChecker::new()));
        pipeline.add(Box::new(InjectionChecker::new()));
        pipeline
    }

    /// Register a checker. Checkers run in registration order.
    pub fn add(&mut self, checker: Box<dyn Checker>) {
        self.checkers.push(checker);
    }

    /// Names of the registered checkers, in run order.
    pub fn checker_names(&self) -> Vec<&str> {
        self.checkers.iter().map(|c| c.name()).collect()
    }

    pub const fn config(&self) -> &QualityGateConfig {
        &self.config
    }

    /// Score `candidate` against `ctx`.
    ///
    /// The score starts at 100, each checker's delta is added and the
    /// total is clamped to `0..=100`. The candidate passes when the score
    /// reaches the effective threshold and no issue is an error.
    #[tracing::instrument(skip_all, fields(checkers = self.checkers.len(), evidence = ctx.evidence.len()))]
    pub fn evaluate(&self, candidate: &str, ctx: &GateContext) -> QualityGateResult {
        let started = Instant::now();
        let mut total = MAX_SCORE;
        let mut issues = Vec::new();
        let mut reports = Vec::with_capacity(self.checkers.len());

        for checker in &self.checkers {
            let (outcome, isolated, duration_ms) = self.run_isolated(checker.as_ref(), candidate, ctx);
            total = total.saturating_add(outcome.score_delta);
            reports.push(CheckerReport {
                checker_name: checker.name().to_string(),
                score_delta: outcome.score_delta,
                issue_count: outcome.issues.len(),
                duration_ms,
                isolated,
            });
            issues.extend(outcome.issues);
        }

        let score = u8::try_from(total.clamp(0, MAX_SCORE)).unwrap_or(0);
        let threshold = self.config.effective_threshold();
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let passed = score >= threshold && !has_errors;

        tracing::info!(
            score,
            threshold,
            passed,
            issue_count = issues.len(),
            elapsed_ms = elapsed_ms(started),
            "Quality gate evaluated"
        );

        QualityGateResult {
            score,
            threshold,
            passed,
            issues,
            checker_reports: reports,
        }
    }

    /// Run one checker, converting an error or panic into a penalty.
    fn run_isolated(
        &self,
        checker: &dyn Checker,
        candidate: &str,
        ctx: &GateContext,
    ) -> (CheckOutcome, bool, u64) {
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| checker.check(candidate, ctx)));
        let duration_ms = elapsed_ms(started);

        let failure = match result {
            Ok(Ok(outcome)) => {
                tracing::debug!(
                    checker = checker.name(),
                    score_delta = outcome.score_delta,
                    issues = outcome.issues.len(),
                    duration_ms,
                    "Checker completed"
                );
                return (outcome, false, duration_ms);
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::warn!(checker = checker.name(), error = %failure, "Checker failed, continuing");
        let mut outcome = CheckOutcome::clean();
        outcome.penalize(
            i32::from(self.config.checker_failure_penalty),
            ValidationIssue::new(
                checker.name(),
                Severity::Warning,
                format!("Checker '{}' failed and was skipped: {failure}", checker.name()),
            ),
        );
        (outcome, true, duration_ms)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionResult, TaskId};

    struct Fixed(&'static str, i32, Severity);

    impl Checker for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn check(&self, _candidate: &str, _ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
            let mut outcome = CheckOutcome::clean();
            if self.1 != 0 {
                outcome.penalize(self.1, ValidationIssue::new(self.0, self.2, "fixed"));
            }
            Ok(outcome)
        }
    }

    struct Extreme(i32);

    impl Checker for Extreme {
        fn name(&self) -> &str {
            "extreme"
        }

        fn check(&self, _candidate: &str, _ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
            Ok(CheckOutcome {
                score_delta: self.0,
                issues: vec![],
            })
        }
    }

    struct Broken;

    impl Checker for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn check(&self, _candidate: &str, _ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
            anyhow::bail!("backing index unavailable")
        }
    }

    struct Panicking;

    impl Checker for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn check(&self, _candidate: &str, _ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
            panic!("index out of bounds")
        }
    }

    fn evidence_ctx() -> GateContext {
        let result = ExecutionResult::succeeded(
            TaskId(3),
            "Modified src/config.rs: the config file was updated",
            vec![],
            1,
        );
        GateContext::from_results([&result])
    }

    #[test]
    fn test_empty_pipeline_scores_full() {
        let result = QualityGatePipeline::new(QualityGateConfig::default()).evaluate("anything", &GateContext::default());
        assert_eq!(result.score, 100);
        assert!(result.passed);
    }

    #[test]
    fn test_score_is_clamped_at_zero() {
        let mut pipeline = QualityGatePipeline::new(QualityGateConfig::default());
        pipeline.add(Box::new(Fixed("a", 70, Severity::Warning)));
        pipeline.add(Box::new(Fixed("b", 70, Severity::Warning)));
        let result = pipeline.evaluate("x", &GateContext::default());
        assert_eq!(result.score, 0);
        assert!(!result.passed);
    }

    #[test]
    fn test_extreme_deltas_saturate_instead_of_overflowing() {
        let mut pipeline = QualityGatePipeline::new(QualityGateConfig::default());
        pipeline.add(Box::new(Extreme(i32::MIN)));
        pipeline.add(Box::new(Extreme(i32::MIN)));
        assert_eq!(pipeline.evaluate("x", &GateContext::default()).score, 0);

        let mut pipeline = QualityGatePipeline::new(QualityGateConfig::default());
        pipeline.add(Box::new(Extreme(i32::MAX)));
        pipeline.add(Box::new(Extreme(i32::MAX)));
        assert_eq!(pipeline.evaluate("x", &GateContext::default()).score, 100);
    }

    #[test]
    fn test_error_issue_fails_despite_score() {
        let mut pipeline = QualityGatePipeline::new(QualityGateConfig::default());
        pipeline.add(Box::new(Fixed("a", 1, Severity::Error)));
        let result = pipeline.evaluate("x", &GateContext::default());
        assert_eq!(result.score, 99);
        assert!(!result.passed);
        assert!(result.has_errors());
    }

    #[test]
    fn test_strict_mode_raises_threshold() {
        let mut pipeline = QualityGatePipeline::new(QualityGateConfig {
            strict: true,
            ..Default::default()
        });
        pipeline.add(Box::new(Fixed("a", 25, Severity::Warning)));
        let result = pipeline.evaluate("x", &GateContext::default());
        assert_eq!(result.score, 75);
        assert_eq!(result.threshold, 80);
        assert!(!result.passed);
    }

    #[test]
    fn test_failing_checkers_are_isolated() {
        let mut pipeline = QualityGatePipeline::new(QualityGateConfig::default());
        pipeline.add(Box::new(Broken));
        pipeline.add(Box::new(Panicking));
        pipeline.add(Box::new(Fixed("after", 10, Severity::Warning)));

        let result = pipeline.evaluate("x", &GateContext::default());
        assert_eq!(result.score, 80);
        assert!(result.passed);
        assert_eq!(result.checker_reports.len(), 3);
        assert!(result.checker_reports[0].isolated);
        assert!(result.checker_reports[1].isolated);
        assert!(!result.checker_reports[2].isolated);

        let broken: Vec<_> = result.issues_by("broken").collect();
        assert_eq!(broken[0].severity, Severity::Warning);
        assert!(broken[0].message.contains("backing index unavailable"));
        let panicked: Vec<_> = result.issues_by("panicking").collect();
        assert!(panicked[0].message.contains("index out of bounds"));
    }

    #[test]
    fn test_default_checkers_accept_grounded_citation() {
        let pipeline = QualityGatePipeline::with_default_checkers(QualityGateConfig::default());
        assert_eq!(pipeline.checker_names().len(), 7);
        let result = pipeline.evaluate("File was modified [Task #3]", &evidence_ctx());
        assert_eq!(result.score, 100, "{:?}", result.issues);
        assert!(result.passed);
    }

    #[test]
    fn test_default_checkers_reject_generic_name() {
        let pipeline = QualityGatePipeline::with_default_checkers(QualityGateConfig::default());
        let result = pipeline.evaluate("Created Class1.ts to hold the config [Task #3]", &evidence_ctx());
        assert!(result.score < 60, "score {}", result.score);
        assert!(!result.passed);
        assert_eq!(result.issues_by("fabrication").count(), 1);
    }
}
