#![allow(clippy::doc_markdown)] // Allow technical terms like SQL*Loader in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # XTRU MPX
//!
//! Parallel command runner for the scripts generated by Extreme Unloader.
//!
//! ## Overview
//!
//! An unload or load of a set of Oracle schemas is driven by a plain text
//! script with one shell command per line (`sqlplus ...`, `sqlldr ...`,
//! `gzip ...`). MPX reads that script, expands `$N` positional and `$NAME`
//! environment placeholders, and runs every command through `/bin/sh -c`.
//!
//! Commands whose program is on the multiplex list are queued; consecutive
//! lines of the same program form one batch that runs with bounded
//! parallelism and must finish completely before the next line starts. All
//! other commands run on their own, one after the other.
//!
//! A child that exits non-zero stops the run unless its program is on the
//! ignore list: tasks that have not started yet cancel themselves, while
//! children already running are allowed to finish.
//!
//! ## Module Organization
//!
//! - [`script`] - placeholder expansion and line parsing
//! - [`execution`] - tasks, child processes, capture files, the synchronizer
//! - [`orchestration`] - the MPX driver, batching plan and run summary
//! - [`run_state`] - cooperative cancellation and live child registry
//! - [`state_machine`] - task lifecycle states
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xtru_mpx::{MpxConfig, Orchestrator, RunState, ScriptInvocation, TracingStatusSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let invocation = ScriptInvocation::parse(["unload.mpx SCOTT"])?;
//! let orchestrator = Orchestrator::new(
//!     MpxConfig::default(),
//!     invocation,
//!     Arc::new(RunState::new()),
//!     Arc::new(TracingStatusSink),
//! );
//! let summary = orchestrator.run().await?;
//! println!("{}", summary.report());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod orchestration;
pub mod run_state;
pub mod script;
pub mod state_machine;

pub use config::{ConfigManager, ConfigOverrides, MpxConfig};
pub use error::{MpxError, Result};
pub use execution::{
    synchronize, MemoryStatusSink, OutputSinks, RunContext, StatusSink, Task, TaskOutcome,
    TracingStatusSink,
};
pub use orchestration::{Orchestrator, RunStatus, RunSummary};
pub use run_state::{RunState, StopReason};
pub use script::{expand, parse_line, ParsedLine, ReplacementTable, ScriptInvocation};
pub use state_machine::TaskState;
