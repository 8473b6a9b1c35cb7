//! Fabrication checker: generic numbered names and placeholders.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::Checker;
use crate::domain::models::{CheckOutcome, GateContext, Severity, ValidationIssue};

const GENERIC_NAME_PENALTY: i32 = 45;
const PLACEHOLDER_PENALTY: i32 = 20;

/// Sequentially numbered stand-in names: `Class1.ts`, `file2`, `MyComponent3.tsx`.
static GENERIC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:my|new|some)?_?(?:class|file|module|component|function|service|test|example|foo|bar|sample|item|widget|object|thing|method|handler)_?\d+(?:\.[a-z]{1,5})?\b",
    )
    .expect("generic name pattern is valid")
});

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)lorem ipsum|\bpath/to/|\byour[_-]?(?:api[_-]?key|name|file)\b|<placeholder>|\bTBD\b")
        .expect("placeholder pattern is valid")
});

/// Flags generic identifiers and placeholders that appear in no evidence.
#[derive(Debug, Default)]
pub struct FabricationChecker;

impl FabricationChecker {
    pub const fn new() -> Self {
        Self
    }
}

impl Checker for FabricationChecker {
    fn name(&self) -> &str {
        "fabrication"
    }

    fn check(&self, candidate: &str, ctx: &GateContext) -> anyhow::Result<CheckOutcome> {
        let evidence = ctx
            .evidence_texts()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("\n");
        let mut outcome = CheckOutcome::clean();

        let names: BTreeSet<&str> = GENERIC_NAME.find_iter(candidate).map(|m| m.as_str()).collect();
        for name in names {
            if evidence.contains(&name.to_lowercase()) {
                continue;
            }
            outcome.penalize(
                GENERIC_NAME_PENALTY,
                ValidationIssue::new(
                    self.name(),
                    Severity::Error,
                    format!("Generic identifier '{name}' does not appear in any task output"),
                ),
            );
        }

        let placeholders: BTreeSet<String> = PLACEHOLDER
            .find_iter(candidate)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        for placeholder in placeholders {
            if evidence.contains(&placeholder) {
                continue;
            }
            outcome.penalize(
                PLACEHOLDER_PENALTY,
                ValidationIssue::new(
                    self.name(),
                    Severity::Warning,
                    format!("Placeholder text '{placeholder}' in response"),
                ),
            );
        }

        Ok(outcome)
    }
}
