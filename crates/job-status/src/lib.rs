//! Status Interpreter
//!
//! Reduces the status a cluster reports for a `PyTorchJob` to one
//! [`ExecutionPhase`](adapter_core::ExecutionPhase). The reducer is a pure
//! function of the snapshot and the job's run policy: it keeps no state
//! between calls, so polling the same snapshot twice yields the same phase.

mod convert;
mod interpreter;

pub use convert::snapshot_from_status;
pub use interpreter::interpret;
