//! # MPX Driver
//!
//! Reads the command file, expands and parses every line, and executes the
//! resulting tasks either immediately or in synchronized concurrent batches.
//!
//! Setup failures (invalid configuration, startup directory, command file,
//! credential helper, capture files) are returned as [`MpxError`] before any task runs. Once
//! tasks run, failures only travel through the shared [`RunState`] and the
//! status lines, so output already produced by sibling tasks is never lost.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::credentials::resolve_stdin_payload;
use super::plan::{ExecutionPlan, PlanStep};
use super::summary::RunSummary;
use crate::config::MpxConfig;
use crate::constants::events::{BATCH_SYNCHRONIZED, RUN_FINISHED, RUN_STARTED};
use crate::error::{MpxError, Result};
use crate::execution::{synchronize, OutputSinks, RunContext, StatusSink, Task};
use crate::logging::log_run_event;
use crate::run_state::RunState;
use crate::script::{
    expand, matches_prefix_list, parse_line, ParsedLine, ReplacementTable, ScriptInvocation,
};

pub struct Orchestrator {
    config: MpxConfig,
    invocation: ScriptInvocation,
    run_state: Arc<RunState>,
    console: Arc<dyn StatusSink>,
    environment: Option<Vec<(String, String)>>,
}

impl Orchestrator {
    pub fn new(
        config: MpxConfig,
        invocation: ScriptInvocation,
        run_state: Arc<RunState>,
        console: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            invocation,
            run_state,
            console,
            environment: None,
        }
    }

    /// Use a fixed environment for `$NAME` placeholders instead of the process environment
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn run_state(&self) -> &Arc<RunState> {
        &self.run_state
    }

    /// Execute the whole script
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "mpx_run",
            %run_id,
            script = %self.invocation.file.display()
        );
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunSummary> {
        let started = Instant::now();
        self.config.validate()?;

        if let Some(dir) = &self.config.startup {
            self.run_state
                .change_directory(dir)
                .await
                .map_err(|source| MpxError::StartupDirectory {
                    path: dir.clone(),
                    source,
                })?;
            info!(directory = %dir.display(), "Changed to startup directory");
        }

        let lines = self.read_script().await?;

        let stdin: Arc<str> =
            resolve_stdin_payload(&self.config.csi, &self.config.credential_helper)
                .await?
                .into();

        let sinks = OutputSinks::create(&self.config.cso, &self.config.cse).await?;
        let ctx = Arc::new(RunContext::new(
            self.run_state.clone(),
            self.console.clone(),
            Arc::new(sinks),
            self.config.heartbeat_interval(),
        ));

        let plan = ExecutionPlan::build(&lines, &self.config.mpxlist);
        log_run_event(
            RUN_STARTED,
            "running",
            Some(&format!(
                "lines={} skipped={} tasks={} batches={} parallelism={}",
                lines.len(),
                lines.iter().filter(|line| line.is_skip()).count(),
                plan.task_count(),
                plan.synchronize_count(),
                self.config.parallelism
            )),
        );

        let mut summary = RunSummary::new(run_id, lines.len());
        let mut queue: VecDeque<Task> = VecDeque::new();

        for step in plan.steps() {
            match *step {
                PlanStep::RunImmediately { line } => {
                    if let Some(task) = self.task_for(&lines, line, &stdin) {
                        let outcome = task.run(&ctx).await;
                        summary.record(&outcome);
                    }
                }
                PlanStep::Enqueue { line } => {
                    if let Some(task) = self.task_for(&lines, line, &stdin) {
                        queue.push_back(task);
                    }
                }
                PlanStep::Synchronize => self.synchronize(&mut queue, &ctx, &mut summary).await,
            }
        }

        // a plan always closes its last batch; this only guards a partial queue
        if !queue.is_empty() {
            self.synchronize(&mut queue, &ctx, &mut summary).await;
        }

        summary.finish(started.elapsed(), self.run_state.stop_reason());
        log_run_event(RUN_FINISHED, summary.status().message(), Some(&summary.report()));

        Ok(summary)
    }

    /// Read, trim, expand and parse every line of the command file
    async fn read_script(&self) -> Result<Vec<ParsedLine>> {
        let path = self
            .invocation
            .resolve_file()
            .ok_or_else(|| MpxError::ScriptNotFound {
                path: self.invocation.file.clone(),
            })?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| MpxError::ScriptRead {
                path: path.clone(),
                source,
            })?;

        let table = match &self.environment {
            Some(vars) => ReplacementTable::from_invocation(
                self.invocation.args.iter().cloned(),
                vars.iter().map(|(k, v)| (k.as_str(), v.clone())),
            ),
            None => ReplacementTable::from_invocation(
                self.invocation.args.iter().cloned(),
                std::env::vars(),
            ),
        };

        Ok(content
            .lines()
            .map(|line| parse_line(&expand(line.trim(), &table), &self.config.comment_markers))
            .collect())
    }

    fn task_for(&self, lines: &[ParsedLine], line: usize, stdin: &Arc<str>) -> Option<Task> {
        let ParsedLine::Command(command) = lines.get(line)? else {
            return None;
        };

        let ignorable = matches_prefix_list(&command.program, &self.config.ignlist);
        Some(Task::new(
            command.clone(),
            progress_label(line + 1, lines.len()),
            ignorable,
            self.config.nice,
            stdin.clone(),
        ))
    }

    async fn synchronize(
        &self,
        queue: &mut VecDeque<Task>,
        ctx: &Arc<RunContext>,
        summary: &mut RunSummary,
    ) {
        let size = queue.len();
        let outcomes = synchronize(self.config.parallelism, queue, ctx.clone()).await;
        summary.record_batch(&outcomes);
        log_run_event(
            BATCH_SYNCHRONIZED,
            "synchronized",
            Some(&format!("batch={} tasks={size}", summary.batches)),
        );
    }
}

/// `"  12/ 340"` style progress label
pub fn progress_label(index: usize, total: usize) -> String {
    format!("{index:>4}/{total:>4}")
}
