//! Agent roles and the capability profile each one maps to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of agent personas a task can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Gathers information and summarises findings.
    Researcher,
    /// Designs structure and interfaces.
    Architect,
    /// Writes and modifies code.
    Coder,
    /// Writes and runs tests.
    Tester,
    /// Reviews work for quality and correctness.
    Reviewer,
    /// Produces prose: docs, reports, summaries.
    Writer,
    /// Analyses data, logs and results.
    Analyst,
    /// Executes repair tasks created by the self-healing loop.
    Healer,
}

impl AgentRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Researcher,
        Self::Architect,
        Self::Coder,
        Self::Tester,
        Self::Reviewer,
        Self::Writer,
        Self::Analyst,
        Self::Healer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Architect => "architect",
            Self::Coder => "coder",
            Self::Tester => "tester",
            Self::Reviewer => "reviewer",
            Self::Writer => "writer",
            Self::Analyst => "analyst",
            Self::Healer => "healer",
        }
    }

    /// Built-in capability profile for this role.
    ///
    /// Roles that share a model hint share an external target, and therefore
    /// share a circuit breaker.
    pub fn default_profile(&self) -> RoleProfile {
        let (model_hint, weight) = match self {
            Self::Researcher | Self::Writer => ("fast", 1),
            Self::Architect | Self::Reviewer | Self::Analyst => ("reasoning", 1),
            Self::Coder | Self::Tester | Self::Healer => ("coding", 1),
        };
        RoleProfile {
            model_hint: model_hint.to_string(),
            target: format!("model:{model_hint}"),
            concurrency_weight: weight,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown agent role: {s}"))
    }
}

/// Capability configuration resolved for a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// Model selection hint passed through to the agent-call capability.
    pub model_hint: String,
    /// External target key; one circuit breaker exists per target.
    pub target: String,
    /// Number of concurrency slots a task of this role occupies.
    pub concurrency_weight: u32,
}

/// Partial per-role override read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOverride {
    #[serde(default)]
    pub model_hint: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub concurrency_weight: Option<u32>,
}

impl RoleProfile {
    /// Apply a configuration override on top of this profile.
    pub fn with_override(mut self, over: &RoleOverride) -> Self {
        if let Some(hint) = &over.model_hint {
            self.model_hint.clone_from(hint);
        }
        if let Some(target) = &over.target {
            self.target.clone_from(target);
        }
        if let Some(weight) = over.concurrency_weight {
            self.concurrency_weight = weight.max(1);
        }
        self
    }
}
