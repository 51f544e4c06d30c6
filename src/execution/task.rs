//! # External Process Task
//!
//! A [`Task`] describes one script command. Running it consumes it, so every
//! task launches at most one child.
//!
//! `run` checks the shared continue flag first and returns a canceled outcome
//! without spawning when the run has been stopped. Otherwise it spawns
//! `/bin/sh -c <command line>` and registers the child PID under the launch
//! lock, then feeds stdin and drains stdout and stderr concurrently while
//! emitting a periodic "still running" line. Exit handling runs under the
//! launch lock again: the PID is released, the record is appended to both
//! capture files and a fatal failure stops the whole run.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use super::context::RunContext;
use super::process::{
    collect_output, compose_command_line, resolve_executable, spawn_shell, CapturedOutput,
};
use super::sinks::CaptureStream;
use crate::constants::events::{TASK_CANCELED, TASK_FINISHED, TASK_STARTING};
use crate::constants::{SHELL, SPAWN_FAILURE_EXIT_CODE};
use crate::logging::log_task_event;
use crate::run_state::StopReason;
use crate::script::CommandLine;
use crate::state_machine::{TaskEvent, TaskLifecycle, TaskState};

/// Final report of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub label: String,
    pub program: String,
    pub state: TaskState,
    /// `None` when no child was spawned
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// One external process invocation
#[derive(Debug)]
pub struct Task {
    program: String,
    args: String,
    label: String,
    ignorable: bool,
    nice: i32,
    stdin: Arc<str>,
}

impl Task {
    pub fn new(
        command: CommandLine,
        label: impl Into<String>,
        ignorable: bool,
        nice: i32,
        stdin: Arc<str>,
    ) -> Self {
        Self {
            program: command.program,
            args: command.args,
            label: label.into(),
            ignorable,
            nice,
            stdin,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the task to its terminal state
    pub async fn run(self, ctx: &RunContext) -> TaskOutcome {
        let started = Instant::now();
        let mut lifecycle = TaskLifecycle::new();

        if !ctx.run_state.should_continue() {
            let state = self.advance(&mut lifecycle, TaskEvent::Cancel);
            ctx.console.status(&self.canceled_line());
            log_task_event(TASK_CANCELED, &self.label, &self.program, "canceled", None);
            return self.outcome(state, None, started.elapsed());
        }
        self.advance(&mut lifecycle, TaskEvent::Start);

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let executable = resolve_executable(&self.program, &cwd, ctx.search_path.as_deref());
        let command_line = compose_command_line(&executable, &self.args, self.nice);
        let starting = self.starting_line(&command_line);
        ctx.console.status(&starting);
        log_task_event(
            TASK_STARTING,
            &self.label,
            &self.program,
            "starting",
            Some(&command_line),
        );

        let (captured, pid) = match self.launch(ctx, &command_line).await {
            Ok((child, pid)) => {
                self.advance(&mut lifecycle, TaskEvent::Launched);
                let captured = self
                    .wait_with_heartbeat(ctx, child, started)
                    .await
                    .unwrap_or_else(|e| {
                        error!(label = %self.label, error = %e, "Lost track of child process");
                        CapturedOutput {
                            exit_code: -1,
                            stdout: String::new(),
                            stderr: format!("{}: {e}\n", self.program),
                        }
                    });
                (captured, pid)
            }
            Err(e) => {
                warn!(label = %self.label, error = %e, "Could not spawn child process");
                let captured = CapturedOutput {
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!("{SHELL}: {e}\n"),
                };
                (captured, None)
            }
        };

        self.finish(ctx, lifecycle, &starting, captured, pid, started)
            .await
    }

    /// Spawn and register the PID as one critical section
    async fn launch(
        &self,
        ctx: &RunContext,
        command_line: &str,
    ) -> io::Result<(Child, Option<u32>)> {
        let _guard = ctx.run_state.launch_lock().await;

        let child = spawn_shell(command_line)?;
        let pid = child.id();
        if let Some(pid) = pid {
            ctx.run_state.register_child(pid);
        }
        debug!(label = %self.label, ?pid, "Spawned child");

        Ok((child, pid))
    }

    async fn wait_with_heartbeat(
        &self,
        ctx: &RunContext,
        child: Child,
        started: Instant,
    ) -> io::Result<CapturedOutput> {
        let collect = collect_output(child, &self.stdin);
        tokio::pin!(collect);

        let period = ctx.heartbeat_interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut collect => return result,
                _ = ticker.tick() => {
                    let _guard = ctx.run_state.launch_lock().await;
                    ctx.console.status(&self.heartbeat_line(started.elapsed()));
                }
            }
        }
    }

    async fn finish(
        &self,
        ctx: &RunContext,
        mut lifecycle: TaskLifecycle,
        starting: &str,
        captured: CapturedOutput,
        pid: Option<u32>,
        started: Instant,
    ) -> TaskOutcome {
        let _guard = ctx.run_state.launch_lock().await;

        if let Some(pid) = pid {
            ctx.run_state.deregister_child(pid);
        }

        let run_continuing = ctx.run_state.should_continue();
        let state = self.advance(
            &mut lifecycle,
            TaskEvent::Exited {
                exit_code: captured.exit_code,
                ignorable: self.ignorable,
                run_continuing,
            },
        );
        let elapsed = started.elapsed();
        let finished = self.finished_line(state, captured.exit_code, elapsed);

        for (stream, text) in [
            (CaptureStream::Stdout, &captured.stdout),
            (CaptureStream::Stderr, &captured.stderr),
        ] {
            if let Err(e) = ctx
                .sinks
                .write_record(stream, starting, text, &finished)
                .await
            {
                error!(
                    label = %self.label,
                    file = %ctx.sinks.path(stream).display(),
                    error = %e,
                    "Could not write captured output"
                );
            }
        }
        ctx.console.status(&finished);

        if state == TaskState::FailedFatal {
            ctx.run_state.request_stop(StopReason::TaskFailed {
                label: self.label.clone(),
                program: self.program.clone(),
                exit_code: captured.exit_code,
            });
        }

        log_task_event(
            TASK_FINISHED,
            &self.label,
            &self.program,
            &state.to_string(),
            Some(&format!("rc={} elapsed={:.2}s", captured.exit_code, elapsed.as_secs_f64())),
        );

        self.outcome(state, Some(captured.exit_code), elapsed)
    }

    fn advance(&self, lifecycle: &mut TaskLifecycle, event: TaskEvent) -> TaskState {
        lifecycle.transition(event).unwrap_or_else(|e| {
            error!(label = %self.label, error = %e, "Unexpected task transition");
            lifecycle.current_state()
        })
    }

    fn outcome(&self, state: TaskState, exit_code: Option<i32>, elapsed: Duration) -> TaskOutcome {
        TaskOutcome {
            label: self.label.clone(),
            program: self.program.clone(),
            state,
            exit_code,
            elapsed,
        }
    }

    fn starting_line(&self, command_line: &str) -> String {
        format!("{} {} starting: {command_line}", self.label, self.program)
    }

    fn heartbeat_line(&self, elapsed: Duration) -> String {
        format!(
            "{} {} still running, {:.2}s elapsed",
            self.label,
            self.program,
            elapsed.as_secs_f64()
        )
    }

    fn canceled_line(&self) -> String {
        format!("{} {} canceled.", self.label, self.program)
    }

    fn finished_line(&self, state: TaskState, exit_code: i32, elapsed: Duration) -> String {
        match state {
            TaskState::Completed => format!(
                "{} {} completed, {:.2}s elapsed.",
                self.label,
                self.program,
                elapsed.as_secs_f64()
            ),
            TaskState::FailedIgnored => format!(
                "{} {} failed with rc={exit_code}, but ignored.",
                self.label, self.program
            ),
            TaskState::FailedFatal => {
                format!("{} {} failed with rc={exit_code}.", self.label, self.program)
            }
            _ => self.canceled_line(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::sinks::{MemoryStatusSink, OutputSinks};
    use crate::run_state::RunState;

    struct Fixture {
        _dir: tempfile::TempDir,
        stdout_path: PathBuf,
        stderr_path: PathBuf,
        console: Arc<MemoryStatusSink>,
        ctx: RunContext,
    }

    async fn fixture(heartbeat: Duration) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let stdout_path = dir.path().join("_stdout.log");
        let stderr_path = dir.path().join("_stderr.log");
        let sinks = OutputSinks::create(&stdout_path, &stderr_path).await.unwrap();
        let console = Arc::new(MemoryStatusSink::new());
        let ctx = RunContext::new(
            Arc::new(RunState::new()),
            console.clone(),
            Arc::new(sinks),
            heartbeat,
        );
        Fixture {
            _dir: dir,
            stdout_path,
            stderr_path,
            console,
            ctx,
        }
    }

    fn task(line: &str, ignorable: bool, stdin: &str) -> Task {
        let (program, args) = line.split_once(' ').unwrap_or((line, ""));
        Task::new(
            CommandLine {
                program: program.to_string(),
                args: args.to_string(),
            },
            "   1/   1",
            ignorable,
            0,
            Arc::from(stdin),
        )
    }

    #[tokio::test]
    async fn test_captured_output_is_bracketed() {
        let f = fixture(Duration::from_secs(60)).await;
        let outcome = task("printf hello", false, "").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::Completed);
        assert_eq!(outcome.exit_code, Some(0));

        let stdout = std::fs::read_to_string(&f.stdout_path).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("printf starting:"));
        assert_eq!(lines[1], "hello");
        assert!(lines[2].contains("completed"));

        let stderr = std::fs::read_to_string(&f.stderr_path).unwrap();
        assert_eq!(stderr.lines().count(), 2);

        let status = f.console.lines();
        assert_eq!(status.len(), 2);
        assert!(status[1].starts_with("   1/   1 printf completed, "));
        assert!(f.ctx.run_state.live_children().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_failure_stops_the_run() {
        let f = fixture(Duration::from_secs(60)).await;
        let outcome = task("false", false, "").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::FailedFatal);
        assert_eq!(outcome.exit_code, Some(1));
        assert!(!f.ctx.run_state.should_continue());
        assert!(f.console.contains("false failed with rc=1."));
        assert!(matches!(
            f.ctx.run_state.stop_reason(),
            Some(StopReason::TaskFailed { exit_code: 1, .. })
        ));

        // the next task is canceled without spawning a child
        let next = task("printf never", false, "").run(&f.ctx).await;
        assert_eq!(next.state, TaskState::Canceled);
        assert_eq!(next.exit_code, None);
        assert!(f.console.contains("printf canceled."));
        let stdout = std::fs::read_to_string(&f.stdout_path).unwrap();
        assert!(!stdout.contains("never"));
    }

    #[tokio::test]
    async fn test_ignored_failure_keeps_running() {
        let f = fixture(Duration::from_secs(60)).await;
        let outcome = task("grep -q needle /dev/null", true, "").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::FailedIgnored);
        assert!(f.ctx.run_state.should_continue());
        assert!(f.console.contains("grep failed with rc=1, but ignored."));

        let next = task("true", false, "").run(&f.ctx).await;
        assert_eq!(next.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_stdin_payload_reaches_child() {
        let f = fixture(Duration::from_secs(60)).await;
        let outcome = task("cat", false, "scott/tiger@orcl").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::Completed);
        let stdout = std::fs::read_to_string(&f.stdout_path).unwrap();
        assert_eq!(stdout.lines().nth(1), Some("scott/tiger@orcl"));
    }

    #[tokio::test]
    async fn test_heartbeat_lines_while_running() {
        let f = fixture(Duration::from_millis(50)).await;
        let outcome = task("sleep 0.3", false, "").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::Completed);
        assert!(f.console.contains("sleep still running, "));
    }

    #[tokio::test]
    async fn test_exit_after_stop_is_reported_as_canceled() {
        let f = fixture(Duration::from_secs(60)).await;
        let run_state = f.ctx.run_state.clone();
        let ctx = f.ctx.clone();
        let handle = tokio::spawn(async move { task("sleep 0.3", false, "").run(&ctx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        run_state.request_stop(StopReason::Signal {
            name: "SIGINT".to_string(),
        });

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.state, TaskState::Canceled);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(f.console.contains("sleep canceled."));
    }

    #[tokio::test]
    async fn test_nice_prefix_in_starting_line() {
        let f = fixture(Duration::from_secs(60)).await;
        let mut t = task("true", false, "");
        t.nice = 5;
        let outcome = t.run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::Completed);
        assert!(f.console.contains("starting: nice -n 5 "));
    }

    #[tokio::test]
    async fn test_without_search_path_the_shell_resolves_the_name() {
        let mut f = fixture(Duration::from_secs(60)).await;
        f.ctx = f.ctx.clone().with_search_path(None);
        let outcome = task("true", false, "").run(&f.ctx).await;

        assert_eq!(outcome.state, TaskState::Completed);
        assert!(f.console.contains("   1/   1 true starting: true"));
    }

    #[tokio::test]
    async fn test_large_stdin_does_not_block_other_launches() {
        let f = fixture(Duration::from_secs(60)).await;
        let payload = "x".repeat(200_000);
        let flood = task(
            "sh -c 'head -c 200000 /dev/zero; cat >/dev/null'",
            false,
            &payload,
        );

        let ctx = f.ctx.clone();
        let handle = tokio::spawn(async move { flood.run(&ctx).await });
        let sibling = tokio::time::timeout(
            Duration::from_secs(10),
            task("printf sibling", false, "").run(&f.ctx),
        )
        .await
        .expect("sibling launch should not wait on another task's stdin");
        let flooded = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("child should not deadlock on its pipes")
            .unwrap();

        assert_eq!(sibling.state, TaskState::Completed);
        assert_eq!(flooded.state, TaskState::Completed);
        assert!(f.ctx.run_state.live_children().is_empty());
    }
}
