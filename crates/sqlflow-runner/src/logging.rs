//! Structured logging for the SQLFlow runner
//!
//! Features:
//! - Human-readable console logging for development
//! - Structured JSON logging for pipelines
//! - File rotation with daily log files
//! - Configurable log levels per module
//!
//! Console logs go to stderr; stdout carries the runner's output.

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "sqlflow-runner.log";

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production (structured logging)
    Json,
    /// Compact format for scripts and testing
    Compact,
}

impl LogFormat {
    /// Unknown names fall back to pretty
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to the console only
    Stdout,
    /// Log to file only
    File,
    /// Log to both console and file
    Both,
}

impl LogOutput {
    /// Unknown names fall back to the console
    pub fn from_name(name: &str) -> Self {
        match name {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stdout,
        }
    }

    fn uses_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

/// Initialize the logging system from the merged configuration
///
/// Examples:
/// ```bash
/// # Development: pretty console output at debug level
/// RUST_LOG=debug LOG_FORMAT=pretty sqlflow-runner -e 'SELECT 1'
///
/// # Pipelines: JSON to file with info level
/// RUST_LOG=info LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/sqlflow sqlflow-runner < job.sql
/// ```
pub fn init(config: &LoggingConfig) -> Result<()> {
    let format = LogFormat::from_name(&config.format);
    let output = LogOutput::from_name(&config.output);

    let env_filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid log level {:?}", config.level))?
        // Filter out noisy third-party crates
        .add_directive("pest=warn".parse()?);

    let console_layer = match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    let file_layer = if output.uses_file() {
        std::fs::create_dir_all(&config.directory)
            .with_context(|| format!("cannot create log directory {}", config.directory))?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.directory, LOG_FILE_NAME);
        Some(fmt::layer().with_writer(file_appender).with_ansi(false).boxed())
    } else {
        None
    };

    let console_layer = (output != LogOutput::File).then_some(console_layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;

    tracing::debug!(
        format = ?format,
        output = ?output,
        level = %config.level,
        "logging initialized"
    );
    if output.uses_file() {
        tracing::debug!(directory = %config.directory, "writing logs to file");
    }

    Ok(())
}

/// Helper macro for logging with structured fields
///
/// Usage:
/// ```rust,ignore
/// log_event!(
///     level: tracing::Level::INFO,
///     event: "statement_lowered",
///     index: 0,
///     kind: "Train"
/// );
/// ```
#[macro_export]
macro_rules! log_event {
    (level: $level:expr, event: $event:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::event!(
            $level,
            event = $event
            $(, $key = ?$value)*
        );
    };
}
