//! # Setup Error Types
//!
//! Errors that abort a run before any task is launched. Failures of individual
//! child processes are not errors: they are reported through the task state and
//! the shared run state (see [`crate::run_state`]).

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Error, Debug)]
pub enum MpxError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Cannot change to startup directory {}: {source}", path.display())]
    StartupDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command file not found: {}", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("Cannot read command file {}: {source}", path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential helper not found: {}", path.display())]
    CredentialHelperNotFound { path: PathBuf },

    #[error("Credential helper {helper} exited with rc={code}: {stderr}")]
    CredentialHelperFailed {
        helper: String,
        code: i32,
        stderr: String,
    },

    #[error("Credential helper {helper} produced no connect string")]
    CredentialMarkerMissing { helper: String },

    #[error("Cannot open output file {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl MpxError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MpxError>;
