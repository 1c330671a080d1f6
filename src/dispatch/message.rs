//! Messages exchanged between the coordinator and its workers
//!
//! These are the only data that cross the coordinator/worker boundary.
//! Sender identity is not part of any message: each worker owns its own
//! pair of channels, so the channel a message arrives on names the worker.

use crate::corpus::Task;
use crate::error::ExtractOutcome;
use std::time::Duration;

/// Coordinator -> worker
#[derive(Debug, Clone)]
pub enum Assignment {
    /// Run this task and report one completion
    Task(Task),

    /// Stop; no further messages follow
    Exit,
}

/// Worker -> coordinator, exactly one per task assignment
#[derive(Debug)]
pub struct Completion {
    /// The task that finished
    pub task: Task,

    /// What the execution wrapper produced
    pub outcome: ExtractOutcome,

    /// Wall time spent in the execution wrapper
    pub elapsed: Duration,
}
