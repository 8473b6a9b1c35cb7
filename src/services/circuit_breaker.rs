//! Per-target circuit breakers for the external agent capability.
//!
//! One breaker exists per external target. Every state change goes through
//! a single mutex-guarded map, so concurrent completions never lose a
//! failure count.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::models::CircuitBreakerSettings;

/// Configuration for circuit breakers.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing a trial.
    pub cooldown: Duration,
    /// Whether to enable circuit breakers.
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold.max(1),
            cooldown: Duration::from_secs(settings.cooldown_secs),
            enabled: settings.enabled,
        }
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast.
    Open,
    /// One trial call is allowed.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a circuit breaker check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitCheckResult {
    /// Request is allowed.
    Allowed,
    /// Request is the single half-open trial.
    Testing,
    /// Request is rejected by an open circuit.
    Blocked { retry_after: Duration },
}

impl CircuitCheckResult {
    /// Whether the call may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::Testing)
    }
}

#[derive(Debug)]
struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_started_at: Option<Instant>,
    open_count: u32,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_started_at: None,
            open_count: 0,
        }
    }

    fn admit(&mut self, config: &CircuitBreakerConfig, now: Instant) -> CircuitCheckResult {
        match self.state {
            CircuitState::Closed => CircuitCheckResult::Allowed,
            CircuitState::Open => {
                let opened_at = self.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= config.cooldown {
                    self.state = CircuitState::HalfOpen;
                    self.trial_started_at = Some(now);
                    CircuitCheckResult::Testing
                } else {
                    CircuitCheckResult::Blocked {
                        retry_after: config.cooldown - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen => {
                // A trial that never reported back is abandoned after one cooldown.
                let stale = self
                    .trial_started_at
                    .map_or(true, |t| now.saturating_duration_since(t) >= config.cooldown);
                if stale {
                    self.trial_started_at = Some(now);
                    CircuitCheckResult::Testing
                } else {
                    CircuitCheckResult::Blocked {
                        retry_after: config.cooldown,
                    }
                }
            }
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.trial_started_at = None;
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.trial_started_at = None;
    }

    /// Apply one call outcome. Returns the new state when it changed.
    fn record(&mut self, success: bool, config: &CircuitBreakerConfig, now: Instant) -> Option<CircuitState> {
        let before = self.state;
        match (self.state, success) {
            (CircuitState::Closed, true) => self.consecutive_failures = 0,
            (CircuitState::Closed, false) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.open(now);
                }
            }
            (CircuitState::HalfOpen, true) => self.close(),
            (CircuitState::HalfOpen, false) => self.open(now),
            // Late completions of calls admitted before the circuit opened.
            (CircuitState::Open, _) => {}
        }
        (self.state != before).then_some(self.state)
    }
}

/// Snapshot of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub target: String,
    pub state: CircuitState,
    /// Failures since the last success while closed.
    pub consecutive_failures: u32,
    /// How many times the circuit has opened.
    pub open_count: u32,
}

/// Service owning every per-target circuit breaker.
#[derive(Debug)]
pub struct CircuitBreakerService {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<String, CircuitBreaker>>,
}

impl CircuitBreakerService {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Service with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Check whether a call to `target` may proceed.
    pub async fn check(&self, target: &str) -> CircuitCheckResult {
        if !self.config.enabled {
            return CircuitCheckResult::Allowed;
        }
        let mut circuits = self.circuits.lock().await;
        let circuit = circuits
            .entry(target.to_string())
            .or_insert_with(CircuitBreaker::new);
        let result = circuit.admit(&self.config, Instant::now());
        if result == CircuitCheckResult::Testing {
            info!(target_key = %target, "Circuit half-open, allowing trial call");
        }
        result
    }

    /// Record a successful call to `target`.
    pub async fn record_success(&self, target: &str) {
        self.record(target, true, None).await;
    }

    /// Record a failed call to `target`.
    pub async fn record_failure(&self, target: &str, error: &str) {
        self.record(target, false, Some(error)).await;
    }

    async fn record(&self, target: &str, success: bool, error: Option<&str>) {
        if !self.config.enabled {
            return;
        }
        let mut circuits = self.circuits.lock().await;
        let circuit = circuits
            .entry(target.to_string())
            .or_insert_with(CircuitBreaker::new);
        match circuit.record(success, &self.config, Instant::now()) {
            Some(CircuitState::Open) => warn!(
                target_key = %target,
                consecutive_failures = circuit.consecutive_failures,
                open_count = circuit.open_count,
                error = error.unwrap_or_default(),
                "Circuit opened"
            ),
            Some(CircuitState::Closed) => info!(target_key = %target, "Circuit closed after successful trial"),
            _ => {}
        }
    }

    /// Current state of `target`, if it has been seen.
    pub async fn get_state(&self, target: &str) -> Option<CircuitState> {
        self.circuits.lock().await.get(target).map(|c| c.state)
    }

    /// Snapshot of every breaker, sorted by target.
    pub async fn stats(&self) -> Vec<CircuitStats> {
        let circuits = self.circuits.lock().await;
        let mut stats: Vec<CircuitStats> = circuits
            .iter()
            .map(|(target, c)| CircuitStats {
                target: target.clone(),
                state: c.state,
                consecutive_failures: c.consecutive_failures,
                open_count: c.open_count,
            })
            .collect();
        stats.sort_by(|a, b| a.target.cmp(&b.target));
        stats
    }

    /// Manually close a circuit.
    pub async fn reset(&self, target: &str) {
        if let Some(circuit) = self.circuits.lock().await.get_mut(target) {
            circuit.close();
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

/// Error from a circuit breaker protected operation.
#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open and rejected the call without running it.
    CircuitOpen { target: String, retry_after: Duration },
    /// The call ran and failed.
    OperationFailed(E),
}

impl<E: fmt::Display> fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen { target, retry_after } => write!(
                f,
                "Circuit breaker open for {target}, retry after {}s",
                retry_after.as_secs()
            ),
            Self::OperationFailed(e) => write!(f, "Operation failed: {e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CircuitBreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CircuitOpen { .. } => None,
            Self::OperationFailed(e) => Some(e),
        }
    }
}

/// Run `f` under the breaker for `target`.
///
/// `is_failure` decides whether an `Ok` value still counts as a failure for
/// breaker purposes (e.g. a reply flagged unsuccessful).
pub async fn with_circuit_breaker<F, T, E>(
    service: &CircuitBreakerService,
    target: &str,
    is_failure: impl FnOnce(&T) -> bool,
    f: F,
) -> Result<T, CircuitBreakerError<E>>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    if let CircuitCheckResult::Blocked { retry_after } = service.check(target).await {
        return Err(CircuitBreakerError::CircuitOpen {
            target: target.to_string(),
            retry_after,
        });
    }

    match f.await {
        Ok(value) => {
            if is_failure(&value) {
                service.record_failure(target, "call reported failure").await;
            } else {
                service.record_success(target).await;
            }
            Ok(value)
        }
        Err(e) => {
            service.record_failure(target, &e.to_string()).await;
            Err(CircuitBreakerError::OperationFailed(e))
        }
    }
}
