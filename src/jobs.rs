//! Bounded worker pool for generation jobs.
//!
//! Workers pull decode→extract→store pipelines from a FIFO queue. At
//! most one job per identity is queued or running at a time; duplicate
//! submissions get a handle to the existing job instead of redundant
//! work. Progress and completion are posted to an mpsc channel that the
//! consumer drains on its own schedule, so no UI toolkit is ever blocked
//! from a worker thread.

mod scheduler;
mod types;
mod worker;

pub use scheduler::JobScheduler;
pub use types::{EngineEvent, JobHandle, JobState};
pub(crate) use worker::WorkerContext;

#[cfg(test)]
mod tests;
