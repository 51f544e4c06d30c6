// State machine module for task lifecycle tracking
//
// A task moves Created -> Starting -> Running -> one of the terminal states,
// or straight from Created to Canceled when the run has already been stopped.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_lifecycle;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use states::TaskState;
pub use task_lifecycle::TaskLifecycle;
