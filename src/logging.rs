//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and, optionally, a
//! JSON log file for post-mortem analysis of long unload runs.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Options taken from the command line
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Number of `-v` flags
    pub verbosity: u8,
    /// Optional JSON log file
    pub log_file: Option<PathBuf>,
}

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging(options: &LoggingOptions) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = get_log_filter(&environment, options.verbosity);

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(filter.clone()));

        let file_layer = options.log_file.as_ref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(filter.clone())),
                ),
                Err(e) => {
                    eprintln!("Cannot open log file {}: {e}", path.display());
                    None
                }
            }
        });

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::debug!(
            pid = std::process::id(),
            environment = %environment,
            filter = %filter,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("MPX_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "production".to_string())
}

/// Explicit filters win, then verbosity, then the environment default
fn get_log_filter(environment: &str, verbosity: u8) -> String {
    if let Ok(filter) = std::env::var("MPX_LOG").or_else(|_| std::env::var("RUST_LOG")) {
        return filter;
    }

    match verbosity {
        0 => get_log_level(environment).to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "test" | "development" => "debug",
        _ => "info",
    }
}

/// Log structured data for task lifecycle events
pub fn log_task_event(
    operation: &str,
    label: &str,
    program: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        label = %label.trim(),
        program = %program,
        status = %status,
        details = details,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "TASK_EVENT"
    );
}

/// Log structured data for run level events
pub fn log_run_event(operation: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        status = %status,
        details = details,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        "RUN_EVENT"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("staging"), "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        let options = LoggingOptions::default();
        init_structured_logging(&options);
        init_structured_logging(&options);
        log_run_event("test", "ok", None);
    }
}
