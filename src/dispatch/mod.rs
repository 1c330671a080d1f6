//! Parallel dispatch of extraction tasks
//!
//! ```text
//!                  ┌─────────────┐
//!   WorkSet ──────▶│ Coordinator │◀────── Completion (per-worker channel)
//!                  └──────┬──────┘
//!                         │ Assignment::Task / Assignment::Exit
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!     ┌─────────┐    ┌─────────┐    ┌─────────┐
//!     │Worker 0 │    │Worker 1 │    │Worker N │
//!     └────┬────┘    └────┬────┘    └────┬────┘
//!          └───────── Extractor ─────────┘
//!                 (parse → extract → write)
//! ```
//!
//! With a single worker the coordinator is skipped entirely and the work
//! set runs on the calling thread.

pub mod coordinator;
pub mod executor;
pub mod message;
pub mod sequential;
pub mod worker;

pub use coordinator::{Coordinator, RunCounters, SlotState};
pub use executor::{DocumentFilter, Extractor, RecordFilter};
pub use message::{Assignment, Completion};
pub use sequential::run_sequential;
pub use worker::{Worker, WorkerStats};

use crate::corpus::{Task, WorkSet};
use crate::error::{ExtractOutcome, Result};
use crate::progress::ProgressSink;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of a dispatch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    /// Handing each worker its first message
    #[default]
    Priming,

    /// Completions are answered with new tasks
    Steady,

    /// Every task is dispatched; waiting for the rest to complete
    Draining,

    /// Every dispatched task has completed
    Done,
}

/// Per-worker totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    pub tasks_executed: u64,
    pub failed: u64,
    pub records: u64,
}

/// Result of a dispatch run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Tasks in the work set
    pub total: u64,

    /// Tasks handed to a worker
    pub dispatched: u64,

    /// Completions received
    pub completed: u64,

    /// Documents whose records were persisted
    pub extracted: u64,

    /// Documents rejected by the validity hook
    pub rejected: u64,

    /// Documents whose output appeared before they ran
    pub skipped: u64,

    /// Documents that failed
    pub failed: u64,

    /// Records persisted across all documents
    pub records: u64,

    /// Documents that failed, in completion order
    pub failures: Vec<PathBuf>,

    /// Per-worker totals, by worker id
    pub per_worker: Vec<WorkerSummary>,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// Time taken for the run
    pub duration: Duration,

    /// Final state; `Done` for every run that returns
    pub state: RunState,
}

impl RunReport {
    pub fn new(total: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            total,
            started_at: Some(started_at),
            ..Default::default()
        }
    }

    /// Fold one completion into the totals
    pub fn record(&mut self, task: &Task, outcome: &ExtractOutcome) {
        match outcome {
            ExtractOutcome::Extracted { records, .. } => {
                self.extracted += 1;
                self.records += *records as u64;
            }
            ExtractOutcome::Rejected => self.rejected += 1,
            ExtractOutcome::Skipped { .. } => self.skipped += 1,
            ExtractOutcome::Failed { .. } => {
                self.failed += 1;
                self.failures.push(task.path.clone());
            }
        }
    }

    /// Returns true if every document completed without failure
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.completed == self.total
    }

    /// Completed documents per second
    pub fn docs_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Run a work set with `workers` execution units
///
/// One unit runs sequentially on the calling thread; more than one spawns
/// that many worker threads under a coordinator.
pub fn run(
    work_set: WorkSet,
    extractor: Extractor,
    workers: usize,
    progress: &dyn ProgressSink,
) -> Result<RunReport> {
    if workers <= 1 {
        Ok(run_sequential(work_set, &extractor, progress))
    } else {
        Coordinator::new(extractor, workers).run(work_set, progress)
    }
}
