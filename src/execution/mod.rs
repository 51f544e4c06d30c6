//! Task execution: process plumbing, the task descriptor, output sinks and
//! the bounded-concurrency synchronizer.

pub mod context;
pub mod process;
pub mod sinks;
pub mod synchronizer;
pub mod task;

pub use context::RunContext;
pub use process::CapturedOutput;
pub use sinks::{CaptureStream, MemoryStatusSink, OutputSinks, StatusSink, TracingStatusSink};
pub use synchronizer::synchronize;
pub use task::{Task, TaskOutcome};
