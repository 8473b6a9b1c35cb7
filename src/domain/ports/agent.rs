//! Agent-call port - interface for the external capability that performs a task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::AgentCallError;
use crate::domain::models::AgentRole;

/// One call to the agent capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub role: AgentRole,
    /// Free-text instruction, normally the task description.
    pub instruction: String,
    /// Model hint from the role profile.
    pub model_hint: String,
    /// External target the call is routed to; also the circuit breaker key.
    pub target: String,
}

/// What the agent capability returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    /// The agent considers the task done.
    pub success: bool,
    /// Backend-specific payload. A `logs` array of strings is captured into
    /// the task's result logs.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl AgentReply {
    /// Successful reply with no raw payload.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            raw: serde_json::Value::Null,
        }
    }

    /// Reply flagged unsuccessful; counts as a failure.
    pub fn unsuccessful(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// Log lines carried in `raw["logs"]`, if any.
    pub fn raw_logs(&self) -> Vec<String> {
        self.raw
            .get("logs")
            .and_then(serde_json::Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The opaque agent-call capability.
///
/// Implementations must distinguish timeouts from application errors; the
/// executor additionally enforces its own timeout around every call.
#[async_trait]
pub trait AgentCall: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn invoke(&self, request: AgentRequest) -> Result<AgentReply, AgentCallError>;
}
