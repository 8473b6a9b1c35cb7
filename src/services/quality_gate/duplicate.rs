//! Duplicate checker: word-shingle similarity against prior responses.

use std::collections::HashSet;

use super::text;
use super::Checker;
use crate::domain::models::{CheckOutcome, GateContext, QualityGateConfig, Severity, ValidationIssue};

const DUPLICATE_PENALTY: i32 = 30;
const NEAR_DUPLICATE_PENALTY: i32 = 10;
const SHINGLE_WORDS: usize = 3;

/// Compares a candidate with earlier responses in the same session.
#[derive(Debug)]
pub struct DuplicateChecker {
    error_similarity: f64,
    warning_similarity: f64,
}

impl DuplicateChecker {
    /// Flag similarity at or above `error_similarity` as an error and at or
    /// above `warning_similarity` as a warning.
    pub const fn new(error_similarity: f64, warning_similarity: f64) -> Self {
        Self {
            error_similarity,
            warning_similarity,
        }
    }

    pub const fn from_config(config: &QualityGateConfig) -> Self {
        Self::new(config.duplicate_error_similarity, config.duplicate_warning_similarity)
    }

    fn fingerprint(body: &str) -> HashSet<String> {
        let body = text::strip_citations(body);
        let shingles = text::shingles(&body, SHINGLE_WORDS);
        if shingles.is_empty() {
            text::words(&body).into_iter().collect()
        } else {
            shingles
        }
    }
}

impl Default for DuplicateChecker {
    fn default() -> Self {
        Self::from_config(&QualityGateConfig::default())
    }
}

impl Checker for DuplicateChecker {
    fn name(&self) -> &str {
        "duplicate"
    }

    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let mut outcome = CheckOutcome::clean();
        let current = Self::fingerprint(candidate);
        if current.is_empty() {
            return Ok(outcome);
        }

        let best = ctx
            .prior_responses
            .iter()
            .enumerate()
            .map(|(i, prior)| (i, text::jaccard(&current, &Self::fingerprint(prior))))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let Some((index, similarity)) = best else {
            return Ok(outcome);
        };
        let percent = similarity * 100.0;
        if similarity >= self.error_similarity {
            outcome.penalize(
                DUPLICATE_PENALTY,
                ValidationIssue::new(
                    self.name(),
                    Severity::Error,
                    format!("Response duplicates prior response {} ({percent:.0}% similar)", index + 1),
                ),
            );
        } else if similarity >= self.warning_similarity {
            outcome.penalize(
                NEAR_DUPLICATE_PENALTY,
                ValidationIssue::new(
                    self.name(),
                    Severity::Warning,
                    format!("Response closely resembles prior response {} ({percent:.0}% similar)", index + 1),
                ),
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIOR: &str = "The parser now accepts trailing commas and reports the line of each syntax error";

    fn ctx() -> GateContext {
        GateContext::default().with_prior_responses([PRIOR.to_string(), "Unrelated earlier answer".to_string()])
    }

    #[test]
    fn test_exact_repeat_is_error() {
        let outcome = DuplicateChecker::default().check(PRIOR, &ctx()).unwrap();
        assert_eq!(outcome.score_delta, -30);
        assert_eq!(outcome.issues[0].severity, Severity::Error);
        assert!(outcome.issues[0].message.contains("prior response 1"));
    }

    #[test]
    fn test_near_repeat_is_warning() {
        let candidate = format!("{PRIOR} and column");
        let outcome = DuplicateChecker::default().check(&candidate, &ctx()).unwrap();
        assert_eq!(outcome.score_delta, -10);
        assert_eq!(outcome.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_fresh_response_is_clean() {
        let outcome = DuplicateChecker::default()
            .check("Added a retry around the flaky upload step", &ctx())
            .unwrap();
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_no_prior_responses() {
        let outcome = DuplicateChecker::default()
            .check(PRIOR, &GateContext::default())
            .unwrap();
        assert!(outcome.issues.is_empty());
    }
}
