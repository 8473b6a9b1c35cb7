//! Integrity checker: cited evidence must be unchanged and quoted exactly.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::text;
use super::Checker;
use crate::domain::models::{content_hash, CheckOutcome, GateContext, Severity, TaskId, ValidationIssue};

const TAMPERED_PENALTY: i32 = 40;
const MISQUOTE_PENALTY: i32 = 10;

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“`]([^"”`\n]{8,})["”`]"#).expect("quote pattern is valid"));

/// Verifies that cited evidence is unchanged and quoted accurately.
///
/// Each cited task's content is re-hashed and compared with the digest
/// recorded when the result was produced. Evidence supplied without a
/// digest cannot be checked and only earns a zero-penalty warning. Quoted
/// spans in a citing sentence must occur verbatim in one of the cited tasks.
#[derive(Debug, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub const fn new() -> Self {
        Self
    }
}

impl Checker for IntegrityChecker {
    fn name(&self) -> &str {
        "integrity"
    }

    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let mut outcome = CheckOutcome::clean();

        let cited: BTreeSet<TaskId> = text::citations(candidate).into_iter().collect();
        for id in &cited {
            let Some(evidence) = ctx.evidence.get(id) else {
                outcome.issues.push(
                    ValidationIssue::new(self.name(), Severity::Warning, format!("Cannot verify unknown task {id}"))
                        .with_evidence(*id),
                );
                continue;
            };
            if evidence.recorded_hash.is_empty() {
                outcome.issues.push(
                    ValidationIssue::new(
                        self.name(),
                        Severity::Warning,
                        format!("Output of task {id} has no recorded hash; integrity unverifiable"),
                    )
                    .with_evidence(*id),
                );
                continue;
            }
            let actual = content_hash(&evidence.content);
            if actual != evidence.recorded_hash {
                outcome.penalize(
                    TAMPERED_PENALTY,
                    ValidationIssue::new(
                        self.name(),
                        Severity::Error,
                        format!("Output of task {id} changed after it was recorded (hash mismatch)"),
                    )
                    .with_evidence(*id),
                );
            }
        }

        for sentence in text::sentences(candidate) {
            let sources: Vec<&str> = text::citations(sentence)
                .iter()
                .filter_map(|id| ctx.evidence.get(id))
                .flat_map(|e| std::iter::once(e.content.as_str()).chain(e.logs.iter().map(String::as_str)))
                .collect();
            if sources.is_empty() {
                continue;
            }
            for caps in QUOTED.captures_iter(sentence) {
                let Some(quote) = caps.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                if sources.iter().any(|s| s.contains(quote)) {
                    continue;
                }
                outcome.penalize(
                    MISQUOTE_PENALTY,
                    ValidationIssue::new(
                        self.name(),
                        Severity::Warning,
                        format!("Quoted text not found in cited output: \"{quote}\""),
                    ),
                );
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionResult, TaskEvidence};

    fn ctx() -> GateContext {
        let result = ExecutionResult::succeeded(TaskId(2), "cargo test: 14 passed, 0 failed", vec![], 1);
        GateContext::from_results([&result])
    }

    #[test]
    fn test_untouched_evidence_passes() {
        let outcome = IntegrityChecker::new()
            .check("The suite reported \"14 passed, 0 failed\" [Task #2]", &ctx())
            .unwrap();
        assert_eq!(outcome, CheckOutcome::clean());
    }

    #[test]
    fn test_tampered_content_is_error() {
        let mut ctx = ctx();
        ctx.evidence.insert(
            TaskId(2),
            TaskEvidence {
                task_id: TaskId(2),
                content: "cargo test: 15 passed, 0 failed".to_string(),
                recorded_hash: content_hash("cargo test: 14 passed, 0 failed"),
                logs: vec![],
            },
        );
        let outcome = IntegrityChecker::new().check("Tests passed [Task #2]", &ctx).unwrap();
        assert_eq!(outcome.score_delta, -40);
        assert_eq!(outcome.issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_misquote_is_warning() {
        let outcome = IntegrityChecker::new()
            .check("The suite reported \"20 passed, 0 failed\" [Task #2]", &ctx())
            .unwrap();
        assert_eq!(outcome.score_delta, -10);
        assert_eq!(outcome.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_recorded_hash_warns_without_penalty() {
        let results: Vec<ExecutionResult> = serde_json::from_str(
            r#"[{"task_id": 2, "success": true, "output": "cargo test: 14 passed, 0 failed",
                "finished_at": "2026-01-05T10:00:00Z"}]"#,
        )
        .unwrap();
        assert!(results[0].content_hash.is_empty());

        let outcome = IntegrityChecker::new()
            .check("Tests passed [Task #2]", &GateContext::from_results(&results))
            .unwrap();
        assert_eq!(outcome.score_delta, 0);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].severity, Severity::Warning);
        assert!(outcome.issues[0].message.contains("unverifiable"));
    }

    #[test]
    fn test_unknown_citation_warns_without_penalty() {
        let outcome = IntegrityChecker::new().check("Done [Task #7]", &ctx()).unwrap();
        assert_eq!(outcome.score_delta, 0);
        assert_eq!(outcome.issues.len(), 1);
    }
}
