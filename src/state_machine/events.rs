use serde::{Deserialize, Serialize};

/// Events that can trigger task state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// `run` was invoked while the run may continue
    Start,
    /// The child process was spawned
    Launched,
    /// The child process was reaped
    Exited {
        exit_code: i32,
        ignorable: bool,
        /// Whether the run was still allowed to continue when the child exited
        run_continuing: bool,
    },
    /// The run was stopped before the task could start
    Cancel,
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Launched => "launched",
            Self::Exited { .. } => "exited",
            Self::Cancel => "cancel",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::Cancel)
    }
}
