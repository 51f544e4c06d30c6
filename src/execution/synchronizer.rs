//! Bounded-concurrency batch barrier.
//!
//! Tasks are started in queue order, at most `max_concurrency` at a time, and
//! the call returns only after every one of them reached a terminal state.
//! Tasks that find the run stopped still get `run` called and cancel
//! themselves, so the queue always drains completely.

use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::context::RunContext;
use super::task::{Task, TaskOutcome};
use crate::run_state::StopReason;
use crate::state_machine::TaskState;

/// Run every queued task and wait for all of them; the queue is empty afterwards
pub async fn synchronize(
    max_concurrency: usize,
    queue: &mut VecDeque<Task>,
    ctx: Arc<RunContext>,
) -> Vec<TaskOutcome> {
    let limit = max_concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut spawned = Vec::with_capacity(queue.len());
    let mut handles = Vec::with_capacity(queue.len());

    debug!(tasks = queue.len(), limit, "Synchronizing batch");

    for task in queue.drain(..) {
        // FIFO: a task is spawned only once it holds a permit
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Batch semaphore closed, dropping remaining tasks");
                break;
            }
        };
        let label = task.label().to_string();
        let program = task.program().to_string();
        let ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit; // Hold permit until done
            task.run(&ctx).await
        });
        spawned.push((label, program));
        handles.push(handle);
    }

    let results = join_all(handles).await;
    let mut outcomes = Vec::with_capacity(results.len());
    for ((label, program), result) in spawned.into_iter().zip(results) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(label = %label, error = %e, "Task panicked");
                ctx.run_state.request_stop(StopReason::TaskFailed {
                    label: label.clone(),
                    program: program.clone(),
                    exit_code: -1,
                });
                outcomes.push(TaskOutcome {
                    label,
                    program,
                    state: TaskState::FailedFatal,
                    exit_code: None,
                    elapsed: Duration::ZERO,
                });
            }
        }
    }

    outcomes
}
