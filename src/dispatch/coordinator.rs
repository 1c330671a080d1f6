//! Extraction coordinator - hands tasks to workers one at a time
//!
//! The coordinator is responsible for:
//! - Spawning the workers and priming each with one task or an exit
//! - Waiting for the next completion from any busy worker
//! - Handing the next pending task to whichever worker just finished
//! - Sending the exit message once nothing is left to hand out
//! - Joining the workers and building the run report
//!
//! Scheduling is pull-based: a worker gets new work only by completing its
//! current task, so faster workers naturally take more documents. Every
//! task is dispatched at most once and never retried.

use crate::corpus::{Task, WorkSet};
use crate::dispatch::executor::Extractor;
use crate::dispatch::message::{Assignment, Completion};
use crate::dispatch::worker::Worker;
use crate::dispatch::{RunReport, RunState};
use crate::error::{Result, WorkerError};
use crate::progress::ProgressSink;
use chrono::Utc;
use crossbeam_channel::Select;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the coordinator believes a worker is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Finished its last task; waiting for an assignment
    Idle,

    /// Holding the task with this id
    Busy(usize),

    /// Sent the exit message; receives nothing further
    Exited,
}

impl SlotState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SlotState::Busy(_))
    }
}

/// Coordinator-local counters
///
/// Invariant: `completed <= dispatched <= total`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total: u64,
    pub dispatched: u64,
    pub completed: u64,
}

impl RunCounters {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// State implied by the counters once priming is over
    pub fn state(&self) -> RunState {
        if self.completed == self.total {
            RunState::Done
        } else if self.dispatched == self.total {
            RunState::Draining
        } else {
            RunState::Steady
        }
    }

    fn record_dispatch(&mut self) {
        self.dispatched += 1;
        debug_assert!(self.dispatched <= self.total);
    }

    fn record_completion(&mut self) {
        self.completed += 1;
        debug_assert!(self.completed <= self.dispatched);
    }
}

/// Coordinates the parallel extraction
pub struct Coordinator {
    /// Execution wrapper cloned into each worker
    extractor: Extractor,

    /// Number of worker threads
    worker_count: usize,
}

impl Coordinator {
    /// Create a coordinator for `worker_count` worker threads
    ///
    /// One worker is valid and runs every task on a single spawned thread.
    /// With zero workers a non-empty work set fails with
    /// [`WorkerError::Stalled`].
    pub fn new(extractor: Extractor, worker_count: usize) -> Self {
        Self {
            extractor,
            worker_count,
        }
    }

    /// Run the work set to completion
    ///
    /// Returns an error only for transport failures; per-document failures
    /// are counted in the report.
    pub fn run(self, work_set: WorkSet, progress: &dyn ProgressSink) -> Result<RunReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let total = work_set.tasks.len() as u64;

        info!(
            documents = total,
            workers = self.worker_count,
            "Starting extraction"
        );

        let workers = self.spawn_workers()?;
        let mut pending: VecDeque<Task> = work_set.tasks.into();
        let mut slots = vec![SlotState::Idle; workers.len()];
        let mut counters = RunCounters::new(total);
        let mut report = RunReport::new(total, started_at);

        // Priming: one message per worker, a task or an exit
        let mut state = RunState::Priming;
        for (id, worker) in workers.iter().enumerate() {
            match pending.pop_front() {
                Some(task) => {
                    slots[id] = SlotState::Busy(task.id);
                    worker.send(Assignment::Task(task))?;
                    counters.record_dispatch();
                }
                None => {
                    worker.send(Assignment::Exit)?;
                    slots[id] = SlotState::Exited;
                }
            }
        }

        let surplus = slots.iter().filter(|s| **s == SlotState::Exited).count();
        if surplus > 0 {
            debug!(surplus, "More workers than documents; released surplus workers");
        }

        state = transition(state, counters.state());

        // Steady and Draining: one completion, then one dispatch or idle
        while counters.completed < counters.total {
            let (id, completion) = next_completion(&workers, &slots, &counters)?;

            let expected = match slots[id] {
                SlotState::Busy(task_id) => Some(task_id),
                _ => None,
            };
            if expected != Some(completion.task.id) {
                return Err(WorkerError::UnexpectedCompletion {
                    id,
                    got: completion.task.id,
                    expected,
                }
                .into());
            }

            counters.record_completion();
            progress.report(counters.completed);

            info!(
                worker = id,
                document = %completion.task.file_name(),
                outcome = completion.outcome.label(),
                completed = counters.completed,
                total = counters.total,
                took_ms = completion.elapsed.as_millis() as u64,
                "Document completed"
            );
            report.record(&completion.task, &completion.outcome);

            match pending.pop_front() {
                Some(task) => {
                    slots[id] = SlotState::Busy(task.id);
                    workers[id].send(Assignment::Task(task))?;
                    counters.record_dispatch();
                }
                None => slots[id] = SlotState::Idle,
            }

            state = transition(state, counters.state());
        }

        // Done: release everyone not already released
        for (id, worker) in workers.iter().enumerate() {
            if slots[id] != SlotState::Exited {
                worker.send(Assignment::Exit)?;
                slots[id] = SlotState::Exited;
            }
        }

        let mut join_error = None;
        for worker in workers {
            let id = worker.id();
            match worker.join() {
                Ok(summary) => report.per_worker.push(summary),
                Err(e) => {
                    warn!(worker = id, error = %e, "Worker failed to join cleanly");
                    join_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = join_error {
            return Err(e.into());
        }

        report.dispatched = counters.dispatched;
        report.completed = counters.completed;
        report.duration = start.elapsed();
        report.state = transition(state, RunState::Done);

        info!(
            completed = report.completed,
            extracted = report.extracted,
            failed = report.failed,
            duration_secs = report.duration.as_secs_f64(),
            "Extraction complete"
        );

        Ok(report)
    }

    fn spawn_workers(&self) -> Result<Vec<Worker>> {
        let workers = (0..self.worker_count)
            .map(|id| Worker::spawn(id, self.extractor.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(count = workers.len(), "Workers spawned");
        Ok(workers)
    }
}

/// Block until any busy worker reports a completion
///
/// The worker is identified by the channel the completion arrived on.
fn next_completion(
    workers: &[Worker],
    slots: &[SlotState],
    counters: &RunCounters,
) -> std::result::Result<(usize, Completion), WorkerError> {
    let busy: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_busy())
        .map(|(id, _)| id)
        .collect();

    if busy.is_empty() {
        return Err(WorkerError::Stalled {
            completed: counters.completed,
            total: counters.total,
        });
    }

    let mut select = Select::new();
    for &id in &busy {
        select.recv(workers[id].completions());
    }

    let op = select.select();
    let id = busy[op.index()];
    let completion = op
        .recv(workers[id].completions())
        .map_err(|_| WorkerError::CompletionChannelClosed { id })?;

    Ok((id, completion))
}

fn transition(from: RunState, to: RunState) -> RunState {
    if from != to {
        debug!(from = ?from, to = ?to, "Coordinator state changed");
    }
    to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_states() {
        let mut counters = RunCounters::new(2);
        assert_eq!(counters.state(), RunState::Steady);

        counters.record_dispatch();
        counters.record_dispatch();
        assert_eq!(counters.state(), RunState::Draining);

        counters.record_completion();
        assert_eq!(counters.state(), RunState::Draining);

        counters.record_completion();
        assert_eq!(counters.state(), RunState::Done);
    }

    #[test]
    fn test_empty_work_set_is_done_immediately() {
        assert_eq!(RunCounters::new(0).state(), RunState::Done);
    }

    #[test]
    fn test_slot_state() {
        assert!(SlotState::Busy(4).is_busy());
        assert!(!SlotState::Idle.is_busy());
        assert!(!SlotState::Exited.is_busy());
    }
}
