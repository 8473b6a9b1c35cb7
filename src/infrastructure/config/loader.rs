//! Layered configuration loading.
//!
//! Sources, lowest to highest precedence: built-in defaults,
//! `.taskmend/config.yaml`, `.taskmend/local.yaml`, then `TASKMEND_*`
//! environment variables (`__` separates nested keys). The merged result is
//! validated before it is handed out.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{AgentRole, Config};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".taskmend";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "TASKMEND_";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_concurrency: {0}. Must be between 1 and 100")]
    InvalidMaxConcurrency(usize),

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid {name}: {value}. Must be between 0 and 100")]
    InvalidThreshold { name: &'static str, value: u8 },

    #[error(
        "Invalid duplicate similarity: warning ({0}) must be positive and not above error ({1}), which must be at most 1"
    )]
    /// Warning and error similarity, in that order.
    InvalidSimilarity(f64, f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Unknown agent role in roles section: {0}")]
    UnknownRole(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .taskmend/config.yaml (project config)
    /// 3. .taskmend/local.yaml (project local overrides, optional)
    /// 4. Environment variables (TASKMEND_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`load`](Self::load) with the project directory made explicit.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let max_concurrency = config.scheduler.max_concurrency;
        if max_concurrency == 0 || max_concurrency > 100 {
            return Err(ConfigError::InvalidMaxConcurrency(max_concurrency));
        }

        if config.executor.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.executor.max_attempts));
        }
        if config.executor.task_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "executor.task_timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "circuit_breaker.failure_threshold must be at least 1".to_string(),
            ));
        }

        let gate = &config.quality_gate;
        for (name, value) in [
            ("quality_gate.threshold", gate.threshold),
            ("quality_gate.strict_threshold", gate.strict_threshold),
            ("quality_gate.checker_failure_penalty", gate.checker_failure_penalty),
        ] {
            if value > 100 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        let (warning, error) = (gate.duplicate_warning_similarity, gate.duplicate_error_similarity);
        if !(warning > 0.0 && warning <= error && error <= 1.0) {
            return Err(ConfigError::InvalidSimilarity(warning, error));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        for name in config.roles.keys() {
            if name.parse::<AgentRole>().is_err() {
                return Err(ConfigError::UnknownRole(name.clone()));
            }
        }

        if config.agent.program.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "agent.program cannot be empty".to_string(),
            ));
        }

        if config.memory.enabled && config.memory.directory.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "memory.directory cannot be empty when memory is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
