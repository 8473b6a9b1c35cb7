//! Agent backed by an external command-line program.
//!
//! One process per call: configured arguments, then the instruction as the
//! final argument. Role, model hint and target are passed through the
//! environment. A non-zero exit is an unsuccessful reply, not an error;
//! failing to start the program means the target is unavailable.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::AgentCallError;
use crate::domain::models::AgentProcessConfig;
use crate::domain::ports::{AgentCall, AgentReply, AgentRequest};

/// Spawns the configured program for every agent call.
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    config: AgentProcessConfig,
}

impl ProcessAgent {
    pub fn new(config: AgentProcessConfig) -> Self {
        Self { config }
    }

    /// Build the reply from captured output.
    ///
    /// When stdout is a JSON object with a `result` or `text` field, that
    /// field is the reply text and the object is kept as `raw`. Stderr lines
    /// are always appended to `raw.logs`.
    fn reply_from(stdout: &str, stderr: &str, success: bool) -> AgentReply {
        let parsed = serde_json::from_str::<serde_json::Value>(stdout.trim())
            .ok()
            .filter(serde_json::Value::is_object);

        let text = parsed
            .as_ref()
            .and_then(|v| v.get("result").or_else(|| v.get("text")))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| stdout.trim().to_string(), str::to_string);

        let mut raw = parsed.unwrap_or_else(|| serde_json::json!({}));
        let mut logs: Vec<serde_json::Value> = raw
            .get("logs")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();
        logs.extend(
            stderr
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| serde_json::Value::String(l.to_string())),
        );
        raw["logs"] = serde_json::Value::Array(logs);

        let reply = if success {
            AgentReply::ok(text)
        } else if text.is_empty() {
            AgentReply::unsuccessful(stderr.trim())
        } else {
            AgentReply::unsuccessful(text)
        };
        reply.with_raw(raw)
    }
}

#[async_trait]
impl AgentCall for ProcessAgent {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn invoke(&self, request: AgentRequest) -> Result<AgentReply, AgentCallError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&request.instruction)
            .env("TASKMEND_ROLE", request.role.as_str())
            .env("TASKMEND_MODEL_HINT", &request.model_hint)
            .env("TASKMEND_TARGET", &request.target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            AgentCallError::Unavailable(format!("Failed to spawn {}: {e}", self.config.program))
        })?;
        let output = child.wait_with_output().await.map_err(|e| {
            AgentCallError::Application(format!("Failed to wait for {}: {e}", self.config.program))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            program = %self.config.program,
            exit_code = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            "Agent process finished"
        );
        Ok(Self::reply_from(&stdout, &stderr, output.status.success()))
    }
}
