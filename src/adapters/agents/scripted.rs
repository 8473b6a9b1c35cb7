//! Scripted agent for tests and dry runs.
//!
//! Replies are chosen by instruction prefix. Each rule holds a queue of
//! responses; the last one repeats once the queue is drained. Instructions
//! that match no rule get an echo reply.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::errors::AgentCallError;
use crate::domain::ports::{AgentCall, AgentReply, AgentRequest};

/// One scripted response.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Reply(AgentReply),
    Error(AgentCallError),
    /// Sleep, then answer with the inner response.
    Delayed(Duration, Box<ScriptedResponse>),
    /// Panic inside the call.
    Panic(String),
}

impl ScriptedResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Reply(AgentReply::ok(text))
    }

    /// Reply flagged unsuccessful.
    pub fn failure(text: impl Into<String>) -> Self {
        Self::Reply(AgentReply::unsuccessful(text))
    }

    /// Application error from the agent.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(AgentCallError::Application(message.into()))
    }

    /// Successful reply whose raw payload carries log lines.
    pub fn success_with_logs(text: impl Into<String>, logs: &[&str]) -> Self {
        Self::Reply(AgentReply::ok(text).with_raw(serde_json::json!({ "logs": logs })))
    }

    /// Answer with `self` after `delay`.
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    responses: VecDeque<ScriptedResponse>,
}

/// An `AgentCall` whose replies are scripted up front.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<AgentRequest>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedAgent {
    /// Agent that echoes every instruction until rules are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add latency to every call, so concurrency becomes observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script responses for instructions starting with `prefix`.
    pub async fn on(&self, prefix: impl Into<String>, responses: impl IntoIterator<Item = ScriptedResponse>) {
        self.rules.lock().await.push(Rule {
            prefix: prefix.into(),
            responses: responses.into_iter().collect(),
        });
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request received, in arrival order.
    pub async fn calls(&self) -> Vec<AgentRequest> {
        self.calls.lock().await.clone()
    }

    /// Number of calls whose instruction starts with `prefix`.
    pub async fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|r| r.instruction.starts_with(prefix))
            .count()
    }

    /// Highest number of calls that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn next_response(&self, instruction: &str) -> ScriptedResponse {
        let mut rules = self.rules.lock().await;
        let rule = rules
            .iter_mut()
            .filter(|r| instruction.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());
        match rule {
            Some(rule) if rule.responses.len() > 1 => rule
                .responses
                .pop_front()
                .unwrap_or_else(|| echo(instruction)),
            Some(rule) => rule
                .responses
                .front()
                .cloned()
                .unwrap_or_else(|| echo(instruction)),
            None => echo(instruction),
        }
    }
}

fn echo(instruction: &str) -> ScriptedResponse {
    ScriptedResponse::success(format!("Completed: {instruction}"))
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentCall for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: AgentRequest) -> Result<AgentReply, AgentCallError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.calls.lock().await.push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut response = self.next_response(&request.instruction).await;
        loop {
            match response {
                ScriptedResponse::Reply(reply) => return Ok(reply),
                ScriptedResponse::Error(e) => return Err(e),
                ScriptedResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
                ScriptedResponse::Panic(message) => panic!("{message}"),
            }
        }
    }
}
