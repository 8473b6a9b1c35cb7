//! Citation checker.

use super::text;
use super::Checker;
use crate::domain::models::{CheckOutcome, GateContext, Severity, ValidationIssue};

const UNKNOWN_TASK_PENALTY: i32 = 20;
const UNCITED_PENALTY: i32 = 5;
const MAX_UNCITED_PENALTY: i32 = 30;

/// Every factual statement must cite a task that exists.
#[derive(Debug, Default)]
pub struct CitationChecker;

impl CitationChecker {
    pub const fn new() -> Self {
        Self
    }
}

impl Checker for CitationChecker {
    fn name(&self) -> &str {
        "citation"
    }

    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let mut outcome = CheckOutcome::clean();

        for id in text::citations(candidate) {
            if !ctx.evidence.contains_key(&id) {
                outcome.penalize(
                    UNKNOWN_TASK_PENALTY,
                    ValidationIssue::new(
                        self.name(),
                        Severity::Error,
                        format!("Citation refers to unknown task {id}"),
                    )
                    .with_evidence(id),
                );
            }
        }

        // Nothing to cite.
        if ctx.evidence.is_empty() {
            return Ok(outcome);
        }

        let mut uncited_penalty = 0;
        for sentence in text::sentences(candidate) {
            if !text::is_factual_statement(sentence) || !text::citations(sentence).is_empty() {
                continue;
            }
            if uncited_penalty >= MAX_UNCITED_PENALTY {
                break;
            }
            uncited_penalty += UNCITED_PENALTY;
            outcome.penalize(
                UNCITED_PENALTY,
                ValidationIssue::new(
                    self.name(),
                    Severity::Warning,
                    format!("Factual statement without a task citation: {sentence}"),
                ),
            );
        }

        Ok(outcome)
    }
}
