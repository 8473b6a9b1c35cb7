//! Tracing subscriber setup: console layer on stderr plus an optional
//! daily-rolling JSON file.

use anyhow::{Context, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::domain::models::LoggingConfig;

const LOG_FILE_NAME: &str = "taskmend.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
///
/// Console output goes to stderr so that `--json` command output on stdout
/// stays machine-readable.
pub struct LoggerImpl {
    guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber described by `config`.
    ///
    /// `RUST_LOG` directives take precedence over `config.level`.
    ///
    /// # Errors
    /// Returns an error for an unknown level, format or rotation, or when a
    /// global subscriber is already installed.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let mut layers: Vec<BoxedLayer> = vec![console_layer(&config.format)?];

        let guard = match &config.log_dir {
            Some(log_dir) => {
                let file_appender = match config.rotation.as_str() {
                    "daily" => rolling::daily(log_dir, LOG_FILE_NAME),
                    "hourly" => rolling::hourly(log_dir, LOG_FILE_NAME),
                    "never" => rolling::never(log_dir, LOG_FILE_NAME),
                    other => anyhow::bail!("Invalid log rotation: {other}"),
                };
                let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

                // File output is always JSON
                layers.push(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking_file)
                        .with_ansi(false)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .boxed(),
                );
                Some(guard)
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::info!(
            level = %config.level,
            format = %config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { guard })
    }

    /// Whether log lines are also written to a rolling file.
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

fn console_layer(format: &str) -> Result<BoxedLayer> {
    let layer = match format {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        other => anyhow::bail!("Invalid log format: {other}"),
    };
    Ok(layer)
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}
