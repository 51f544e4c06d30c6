//! # Runner Configuration
//!
//! Resolved settings consumed by the orchestrator. Values are layered by
//! [`ConfigManager`]: built-in defaults, an optional configuration file,
//! `MPX_*` environment variables and finally command-line overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use xtru_mpx::config::{ConfigManager, ConfigOverrides};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load(None, &ConfigOverrides::default())?;
//! println!("running with parallelism {}", config.parallelism);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COMMENT_MARKERS, DEFAULT_CREDENTIAL_HELPER, DEFAULT_HEARTBEAT_INTERVAL_MS,
    DEFAULT_IGNORE_LIST, DEFAULT_MULTIPLEX_LIST, DEFAULT_PARALLELISM, DEFAULT_STDERR_FILE,
    DEFAULT_STDOUT_FILE, MAX_NICE, MAX_PARALLELISM, MIN_NICE,
};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{ConfigManager, ConfigOverrides};

/// Custom deserializer for program lists that accepts both the comma-separated
/// string form used on the command line and a proper sequence from config files
fn deserialize_name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        // Simple string format: mpxlist = "sqlldr,sqlplus"
        Value::String(s) => Ok(split_name_list(&s)),
        // Sequence format: mpxlist = ["sqlldr", "sqlplus"]
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(D::Error::custom(format!(
                    "Program list entries must be strings, got {other}"
                ))),
            })
            .filter(|entry| !matches!(entry, Ok(s) if s.is_empty()))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom(
            "Program list must be either a comma-separated string or a list of strings",
        )),
    }
}

/// Split a comma-separated program list, dropping empty entries
pub fn split_name_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Root configuration of a multiplexed run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MpxConfig {
    /// Maximum number of concurrently running multiplexed tasks
    pub parallelism: usize,

    /// Scheduling priority passed to `nice` for every child
    pub nice: i32,

    /// Programs whose invocations are queued and run in concurrent batches
    #[serde(deserialize_with = "deserialize_name_list")]
    pub mpxlist: Vec<String>,

    /// Program prefixes whose non-zero exit does not stop the run
    #[serde(deserialize_with = "deserialize_name_list")]
    pub ignlist: Vec<String>,

    /// Working directory for the run; the initial directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup: Option<PathBuf>,

    /// Text fed to every child's stdin, or `@<file>` for the credential helper
    pub csi: String,

    /// Aggregated stdout capture file
    pub cso: PathBuf,

    /// Aggregated stderr capture file
    pub cse: PathBuf,

    /// Interval of the "still running" status line
    pub heartbeat_interval_ms: u64,

    /// Credential helper name (resolved next to the executable) or path
    pub credential_helper: String,

    /// Markers that turn a script line into a comment
    #[serde(deserialize_with = "deserialize_name_list")]
    pub comment_markers: Vec<String>,

    /// Forward stop signals to live children
    pub forward_signals: bool,
}

impl Default for MpxConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            nice: 0,
            mpxlist: DEFAULT_MULTIPLEX_LIST.iter().map(|s| s.to_string()).collect(),
            ignlist: DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect(),
            startup: None,
            csi: String::new(),
            cso: PathBuf::from(DEFAULT_STDOUT_FILE),
            cse: PathBuf::from(DEFAULT_STDERR_FILE),
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            credential_helper: DEFAULT_CREDENTIAL_HELPER.to_string(),
            comment_markers: DEFAULT_COMMENT_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            forward_signals: false,
        }
    }
}

impl MpxConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(ConfigurationError::invalid_value(
                "parallelism",
                self.parallelism.to_string(),
                format!("must be between 1 and {MAX_PARALLELISM}"),
            ));
        }

        if !(MIN_NICE..=MAX_NICE).contains(&self.nice) {
            return Err(ConfigurationError::invalid_value(
                "nice",
                self.nice.to_string(),
                format!("must be between {MIN_NICE} and {MAX_NICE}"),
            ));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "heartbeat_interval_ms",
                "0",
                "must be greater than zero",
            ));
        }

        if self.cso.as_os_str().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "cso",
                "output redirection",
            ));
        }

        if self.cse.as_os_str().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "cse",
                "output redirection",
            ));
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
