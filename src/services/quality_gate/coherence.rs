//! Coherence checker: statements on the same topic that assert opposites.

use std::collections::HashSet;

use super::text;
use super::Checker;
use crate::domain::models::{CheckOutcome, GateContext, Severity, ValidationIssue};

const CONTRADICTION_PENALTY: i32 = 15;
const MAX_PENALTY: i32 = 45;
/// Topic overlap two statements need before they can contradict.
const MIN_TOPIC_SIMILARITY: f64 = 0.5;

const ANTONYMS: &[(&str, &str)] = &[
    ("succeeded", "failed"),
    ("passed", "failed"),
    ("passes", "fails"),
    ("added", "removed"),
    ("created", "deleted"),
    ("enabled", "disabled"),
    ("increased", "decreased"),
    ("true", "false"),
    ("success", "failure"),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "cannot", "none", "nothing"];

struct Statement<'a> {
    text: &'a str,
    words: HashSet<String>,
    topic: HashSet<String>,
    negated: bool,
}

impl<'a> Statement<'a> {
    fn parse(sentence: &'a str) -> Self {
        let body = text::strip_citations(sentence);
        let words: HashSet<String> = text::words(&body).into_iter().collect();
        let negated = words
            .iter()
            .any(|w| NEGATIONS.contains(&w.as_str()) || w.ends_with("n't"));
        let topic = text::content_words(&body)
            .into_iter()
            .filter(|w| !is_polar(w) && !NEGATIONS.contains(&w.as_str()) && !w.ends_with("n't"))
            .map(|w| text::stem(&w))
            .collect();
        Self {
            text: sentence,
            words,
            topic,
            negated,
        }
    }

    fn has(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

fn is_polar(word: &str) -> bool {
    ANTONYMS.iter().any(|(a, b)| *a == word || *b == word)
}

fn opposed(a: &Statement<'_>, b: &Statement<'_>) -> bool {
    let antonym = ANTONYMS
        .iter()
        .any(|(x, y)| (a.has(x) && b.has(y) && !a.has(y)) || (a.has(y) && b.has(x) && !a.has(x)));
    antonym || a.negated != b.negated
}

/// Flags pairs of statements in one response that contradict each other.
#[derive(Debug, Default)]
pub struct CoherenceChecker;

impl CoherenceChecker {
    pub const fn new() -> Self {
        Self
    }
}

impl Checker for CoherenceChecker {
    fn name(&self) -> &str {
        "coherence"
    }

    fn check(&self, candidate: &str, _ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let statements: Vec<Statement<'_>> = text::sentences(candidate)
            .into_iter()
            .filter(|s| text::is_factual_statement(s))
            .map(Statement::parse)
            .collect();

        let mut outcome = CheckOutcome::clean();
        for (i, a) in statements.iter().enumerate() {
            for b in &statements[i + 1..] {
                if a.topic.is_empty() || text::jaccard(&a.topic, &b.topic) < MIN_TOPIC_SIMILARITY {
                    continue;
                }
                if !opposed(a, b) {
                    continue;
                }
                if -outcome.score_delta >= MAX_PENALTY {
                    return Ok(outcome);
                }
                outcome.penalize(
                    CONTRADICTION_PENALTY,
                    ValidationIssue::new(
                        self.name(),
                        Severity::Warning,
                        format!("Contradictory statements: \"{}\" vs \"{}\"", a.text, b.text),
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

    fn check(candidate: &str) -> CheckOutcome {
        CoherenceChecker::new()
            .check(candidate, &GateContext::default())
            .unwrap()
    }

    #[test]
    fn test_antonym_contradiction() {
        let outcome = check("All integration tests passed. All integration tests failed.");
        assert_eq!(outcome.score_delta, -15);
        assert_eq!(outcome.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_negation_contradiction() {
        let outcome = check("The migration script was executed. The migration script was not executed.");
        assert_eq!(outcome.issues.len(), 1);
    }

    #[test]
    fn test_unrelated_statements_are_coherent() {
        let outcome = check("The parser tests passed. The deployment to staging failed.");
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_consistent_statements() {
        let outcome = check("Created the users table. The users table was created with 4 columns.");
        assert!(outcome.issues.is_empty());
    }
}
