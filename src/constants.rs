//! # System Constants
//!
//! Defaults and fixed texts that define the operational boundaries of the
//! multiplexed command runner.

/// Programs whose invocations are queued and run concurrently by default
pub const DEFAULT_MULTIPLEX_LIST: &[&str] = &["sqlldr", "sqlplus"];

/// Program prefixes whose non-zero exit does not stop the run by default
pub const DEFAULT_IGNORE_LIST: &[&str] = &["grep"];

/// Markers that turn a script line into a comment when they prefix its first token
pub const DEFAULT_COMMENT_MARKERS: &[&str] = &["#", ";"];

pub const DEFAULT_STDOUT_FILE: &str = "_stdout.log";
pub const DEFAULT_STDERR_FILE: &str = "_stderr.log";

pub const DEFAULT_PARALLELISM: usize = 4;
pub const MAX_PARALLELISM: usize = 64;

pub const MIN_NICE: i32 = -20;
pub const MAX_NICE: i32 = 19;

pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// Helper that decrypts `@file` stdin payloads, looked up next to the running executable
pub const DEFAULT_CREDENTIAL_HELPER: &str = "xtrudecrypt";

/// The connect string is printed on the line after this marker by the credential helper
pub const CREDENTIAL_MARKER: &str = "Connect string is:";

/// Prefix of the `csi` value that selects the credential helper
pub const CREDENTIAL_FILE_PREFIX: char = '@';

/// Every child is started through this shell
pub const SHELL: &str = "/bin/sh";

/// Exit code reported when the shell itself cannot be spawned
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "MPX";

/// Structured event names emitted through the logging layer
pub mod events {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const BATCH_SYNCHRONIZED: &str = "batch.synchronized";
    pub const TASK_STARTING: &str = "task.starting";
    pub const TASK_FINISHED: &str = "task.finished";
    pub const TASK_CANCELED: &str = "task.canceled";
    pub const STOP_REQUESTED: &str = "run.stop_requested";
}
