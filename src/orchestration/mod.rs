//! # Orchestration
//!
//! The MPX driver and the pieces it is built from: stdin payload resolution,
//! the batching plan and the run summary.

pub mod credentials;
pub mod orchestrator;
pub mod plan;
pub mod summary;

pub use credentials::resolve_stdin_payload;
pub use orchestrator::{progress_label, Orchestrator};
pub use plan::{ExecutionPlan, PlanStep};
pub use summary::{RunStatus, RunSummary};
