//! Task execution -- one task from resolution to its terminal outcome.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state and the progress sink feeding the event hub
//! - [`orchestration`] - Stage sequencing and cancellation
//! - [`finalization`] - Outcome records and partial-output cleanup

mod context;
mod finalization;
mod orchestration;


pub(crate) use context::TaskContext;
pub(crate) use orchestration::run_task;
