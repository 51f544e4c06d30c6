use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one external process task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Fields set, no subprocess yet
    Created,
    /// Start-of-run checks passed, command being prepared and spawned
    Starting,
    /// Child process is alive
    Running,
    /// Child exited with code 0
    Completed,
    /// Child exited non-zero but the program is on the ignore list
    FailedIgnored,
    /// Child exited non-zero and the run was stopped
    FailedFatal,
    /// Run was already stopped when the task started or finished
    Canceled,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::FailedIgnored | Self::FailedFatal | Self::Canceled
        )
    }

    /// Check if the child exited non-zero
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedIgnored | Self::FailedFatal)
    }

    /// Check if this is an active state (task is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::FailedIgnored => write!(f, "failed_ignored"),
            Self::FailedFatal => write!(f, "failed_fatal"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed_ignored" => Ok(Self::FailedIgnored),
            "failed_fatal" => Ok(Self::FailedFatal),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

/// Default state for new tasks
impl Default for TaskState {
    fn default() -> Self {
        Self::Created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_terminal_check() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::FailedIgnored.is_terminal());
        assert!(TaskState::FailedFatal.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(!TaskState::Created.is_terminal());
        assert!(!TaskState::Starting.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(TaskState::Starting.is_active());
        assert!(TaskState::Running.is_active());
        assert!(!TaskState::Created.is_active());
        assert!(!TaskState::Completed.is_active());
        assert!(!TaskState::Canceled.is_active());
    }

    #[test]
    fn test_failure_states() {
        assert!(TaskState::FailedIgnored.is_failure());
        assert!(TaskState::FailedFatal.is_failure());
        assert!(!TaskState::Canceled.is_failure());
        assert!(!TaskState::Completed.is_failure());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(TaskState::FailedIgnored.to_string(), "failed_ignored");
        assert_eq!("canceled".parse::<TaskState>().unwrap(), TaskState::Canceled);
        assert!("done".parse::<TaskState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&TaskState::FailedFatal).unwrap();
        assert_eq!(json, "\"failed_fatal\"");

        let parsed: TaskState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskState::FailedFatal);
    }
}
