//! Grounding checker: claims must share vocabulary with their evidence.

use std::collections::HashSet;

use super::text;
use super::Checker;
use crate::domain::models::{CheckOutcome, GateContext, Severity, TaskId, ValidationIssue};

const UNGROUNDED_PENALTY: i32 = 10;
const MAX_PENALTY: i32 = 40;
/// Share of a claim's stems that must appear in its evidence.
const MIN_OVERLAP: f64 = 0.3;

/// Checks that factual claims are traceable to task evidence.
///
/// A claim citing tasks is compared against those tasks only; an uncited
/// claim against all evidence. With no evidence at all there is nothing to
/// ground against and the check is skipped.
#[derive(Debug, Default)]
pub struct GroundingChecker;

impl GroundingChecker {
    pub const fn new() -> Self {
        Self
    }

    fn evidence_stems(ctx: &GateContext, cited: &[TaskId]) -> HashSet<String> {
        if cited.is_empty() {
            return ctx.evidence_texts().flat_map(text::stems).collect();
        }
        cited
            .iter()
            .filter_map(|id| ctx.evidence.get(id))
            .flat_map(|e| std::iter::once(e.content.as_str()).chain(e.logs.iter().map(String::as_str)))
            .flat_map(text::stems)
            .collect()
    }
}

impl Checker for GroundingChecker {
    fn name(&self) -> &str {
        "grounding"
    }

    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let mut outcome = CheckOutcome::clean();
        if ctx.evidence.is_empty() {
            return Ok(outcome);
        }

        for sentence in text::sentences(candidate) {
            if !text::is_factual_statement(sentence) {
                continue;
            }
            let claim = text::stems(&text::strip_citations(sentence));
            if claim.is_empty() {
                continue;
            }
            let cited = text::citations(sentence);
            let evidence = Self::evidence_stems(ctx, &cited);
            let overlap = claim.intersection(&evidence).count() as f64 / claim.len() as f64;
            if overlap >= MIN_OVERLAP {
                continue;
            }
            if -outcome.score_delta >= MAX_PENALTY {
                break;
            }
            let mut issue = ValidationIssue::new(
                self.name(),
                Severity::Warning,
                format!(
                    "Claim not supported by task evidence ({:.0}% overlap): {sentence}",
                    overlap * 100.0
                ),
            );
            if let Some(first) = cited.first() {
                issue = issue.with_evidence(*first);
            }
            outcome.penalize(UNGROUNDED_PENALTY, issue);
        }

        Ok(outcome)
    }
}
