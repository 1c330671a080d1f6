//! Worker thread logic for parallel extraction
//!
//! Each worker:
//! - Owns one assignment channel and one completion channel
//! - Blocks until the coordinator sends it a task or the exit message
//! - Runs the task through the execution wrapper
//! - Reports exactly one completion per task, then waits again
//!
//! A worker never decides what to run next and never retries.

use crate::dispatch::executor::Extractor;
use crate::dispatch::message::{Assignment, Completion};
use crate::dispatch::WorkerSummary;
use crate::error::{ExtractOutcome, WorkerError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Tasks run through the execution wrapper
    pub tasks_executed: AtomicU64,

    /// Tasks that failed
    pub failed: AtomicU64,

    /// Records persisted
    pub records: AtomicU64,
}

impl WorkerStats {
    fn record(&self, outcome: &ExtractOutcome) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        if outcome.is_failure() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.records
            .fetch_add(outcome.records() as u64, Ordering::Relaxed);
    }

    fn summary(&self, id: usize) -> WorkerSummary {
        WorkerSummary {
            id,
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
        }
    }
}

/// Coordinator-side handle to one worker thread
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), WorkerError>>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,

    /// Coordinator -> worker
    assignments: Sender<Assignment>,

    /// Worker -> coordinator
    completions: Receiver<Completion>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(id: usize, extractor: Extractor) -> Result<Self, WorkerError> {
        // One slot each way: a worker holds at most one task at a time
        let (assign_tx, assign_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("extract-worker-{}", id))
            .spawn(move || worker_loop(id, extractor, assign_rx, done_tx, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
            assignments: assign_tx,
            completions: done_rx,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Send one assignment
    pub fn send(&self, assignment: Assignment) -> Result<(), WorkerError> {
        self.assignments
            .send(assignment)
            .map_err(|_| WorkerError::AssignmentSendFailed { id: self.id })
    }

    /// Channel this worker reports completions on
    pub fn completions(&self) -> &Receiver<Completion> {
        &self.completions
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<WorkerSummary, WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => {
                    return Err(WorkerError::Panicked {
                        id: self.id,
                        message: "Worker thread panicked".into(),
                    })
                }
            }
        }
        Ok(self.stats.summary(self.id))
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    extractor: Extractor,
    assignments: Receiver<Assignment>,
    completions: Sender<Completion>,
    stats: Arc<WorkerStats>,
) -> Result<(), WorkerError> {
    debug!(worker = id, "Worker starting");

    loop {
        let assignment = assignments
            .recv()
            .map_err(|_| WorkerError::AssignmentChannelClosed { id })?;

        let task = match assignment {
            Assignment::Task(task) => task,
            Assignment::Exit => break,
        };

        debug!(worker = id, task = task.id, path = %task.path.display(), "Task received");

        let start = Instant::now();
        let outcome = extractor.run(&task);
        stats.record(&outcome);

        completions
            .send(Completion {
                task,
                outcome,
                elapsed: start.elapsed(),
            })
            .map_err(|_| WorkerError::CompletionChannelClosed { id })?;
    }

    info!(
        worker = id,
        tasks = stats.tasks_executed.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        "Worker finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Task;
    use crate::error::PipelineResult;
    use crate::pipeline::{Document, Pipeline, Record, RecordSet};
    use crate::store::{MemoryStore, OutputKey, OutputStore};
    use std::path::{Path, PathBuf};

    struct OneRecord;

    impl Pipeline for OneRecord {
        fn parse(&self, path: &Path) -> PipelineResult<Document> {
            Ok(Document::new(path))
        }

        fn extract(&self, _document: &Document) -> PipelineResult<RecordSet> {
            Ok(vec![Record::new("m", 0)].into())
        }
    }

    fn extractor(store: Arc<MemoryStore>) -> Extractor {
        Extractor::new(Arc::new(OneRecord), store)
    }

    #[test]
    fn test_worker_runs_task_then_exits() {
        let store = Arc::new(MemoryStore::new());
        let worker = Worker::spawn(7, extractor(store.clone())).unwrap();

        let task = Task::new(0, PathBuf::from("/corpus/a.txt"));
        worker.send(Assignment::Task(task.clone())).unwrap();

        let completion = worker.completions().recv().unwrap();
        assert_eq!(completion.task, task);
        assert!(matches!(
            completion.outcome,
            ExtractOutcome::Extracted { records: 1, .. }
        ));

        worker.send(Assignment::Exit).unwrap();
        let summary = worker.join().unwrap();
        assert_eq!(summary.id, 7);
        assert_eq!(summary.tasks_executed, 1);
        assert_eq!(summary.records, 1);
        assert!(store.exists(&OutputKey::new("a")));
    }

    #[test]
    fn test_worker_exit_without_tasks() {
        let worker = Worker::spawn(0, extractor(Arc::new(MemoryStore::new()))).unwrap();
        worker.send(Assignment::Exit).unwrap();
        let summary = worker.join().unwrap();
        assert_eq!(summary.tasks_executed, 0);
    }

    #[test]
    fn test_dropped_handle_stops_worker() {
        let (assign_tx, assign_rx) = bounded::<Assignment>(1);
        let (done_tx, _done_rx) = bounded(1);
        drop(assign_tx);

        let result = worker_loop(
            3,
            extractor(Arc::new(MemoryStore::new())),
            assign_rx,
            done_tx,
            Arc::new(WorkerStats::default()),
        );
        assert!(matches!(
            result,
            Err(WorkerError::AssignmentChannelClosed { id: 3 })
        ));
    }
}
