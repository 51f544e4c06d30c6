use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::TaskState,
};

/// In-memory state machine tracking one task from creation to its terminal state
#[derive(Debug, Clone, Default)]
pub struct TaskLifecycle {
    state: TaskState,
}

impl TaskLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state of the task
    pub fn current_state(&self) -> TaskState {
        self.state
    }

    /// Attempt to transition the task state
    pub fn transition(&mut self, event: TaskEvent) -> StateMachineResult<TaskState> {
        let target = Self::determine_target_state(self.state, &event)?;
        self.state = target;
        Ok(target)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(
        current_state: TaskState,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskState> {
        let target = match (current_state, event) {
            (TaskState::Created, TaskEvent::Start) => TaskState::Starting,
            (TaskState::Created, TaskEvent::Cancel) => TaskState::Canceled,

            (TaskState::Starting, TaskEvent::Launched) => TaskState::Running,

            // A spawn failure is reported like an exit, straight from Starting
            (state, TaskEvent::Exited { .. }) if state.is_active() => classify_exit(event),

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

/// Exit classification: a stopped run wins over the exit code
fn classify_exit(event: &TaskEvent) -> TaskState {
    match *event {
        TaskEvent::Exited {
            run_continuing: false,
            ..
        } => TaskState::Canceled,
        TaskEvent::Exited { exit_code: 0, .. } => TaskState::Completed,
        TaskEvent::Exited {
            ignorable: true, ..
        } => TaskState::FailedIgnored,
        _ => TaskState::FailedFatal,
    }
}
