//! Aggregate result of one orchestrator run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::execution::TaskOutcome;
use crate::run_state::StopReason;
use crate::state_machine::TaskState;

/// Overall outcome shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped by an external request, not by a failing task
    Canceled,
    Failed,
}

impl RunStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Completed => "Completed successfully",
            Self::Canceled => "Canceled by request",
            Self::Failed => "Failed with an error",
        }
    }

    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Canceled => 130,
            Self::Failed => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Script lines including blanks and comments
    pub lines: usize,
    pub tasks: usize,
    pub completed: usize,
    pub failed_ignored: usize,
    pub failed_fatal: usize,
    pub canceled: usize,
    /// Number of synchronizer calls
    pub batches: usize,
    pub elapsed: Duration,
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    pub fn new(run_id: Uuid, lines: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            lines,
            tasks: 0,
            completed: 0,
            failed_ignored: 0,
            failed_fatal: 0,
            canceled: 0,
            batches: 0,
            elapsed: Duration::ZERO,
            stop_reason: None,
        }
    }

    pub fn record(&mut self, outcome: &TaskOutcome) {
        self.tasks += 1;
        match outcome.state {
            TaskState::Completed => self.completed += 1,
            TaskState::FailedIgnored => self.failed_ignored += 1,
            TaskState::FailedFatal => self.failed_fatal += 1,
            TaskState::Canceled => self.canceled += 1,
            // run always ends in a terminal state
            TaskState::Created | TaskState::Starting | TaskState::Running => {}
        }
    }

    pub fn record_batch(&mut self, outcomes: &[TaskOutcome]) {
        self.batches += 1;
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    pub fn finish(&mut self, elapsed: Duration, stop_reason: Option<StopReason>) {
        self.elapsed = elapsed;
        self.stop_reason = stop_reason;
    }

    pub fn status(&self) -> RunStatus {
        match &self.stop_reason {
            Some(StopReason::Signal { .. }) => RunStatus::Canceled,
            Some(StopReason::TaskFailed { .. }) => RunStatus::Failed,
            None if self.failed_fatal > 0 => RunStatus::Failed,
            None => RunStatus::Completed,
        }
    }

    /// Tasks per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tasks as f64 / secs
        } else {
            0.0
        }
    }

    /// Final report line
    pub fn report(&self) -> String {
        let mut report = format!(
            "{}: {} tasks in {:.2}s ({:.2} tasks/s); {} completed, {} failed (ignored), {} failed, {} canceled, {} batches",
            self.status(),
            self.tasks,
            self.elapsed.as_secs_f64(),
            self.throughput(),
            self.completed,
            self.failed_ignored,
            self.failed_fatal,
            self.canceled,
            self.batches,
        );
        if let Some(reason) = &self.stop_reason {
            report.push_str(&format!("; stopped: {reason}"));
        }
        report
    }
}
