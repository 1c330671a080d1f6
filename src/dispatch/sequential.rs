//! Single-threaded fallback
//!
//! With one execution unit there is nobody to coordinate: the work set is
//! run in order on the calling thread through the same execution wrapper,
//! so outputs are identical to a threaded run.

use crate::corpus::WorkSet;
use crate::dispatch::executor::Extractor;
use crate::dispatch::{RunReport, RunState, WorkerSummary};
use crate::progress::ProgressSink;
use chrono::Utc;
use std::time::Instant;
use tracing::info;

/// Run every task in order on the current thread
pub fn run_sequential(
    work_set: WorkSet,
    extractor: &Extractor,
    progress: &dyn ProgressSink,
) -> RunReport {
    let start = Instant::now();
    let total = work_set.tasks.len() as u64;
    let mut report = RunReport::new(total, Utc::now());
    let mut summary = WorkerSummary {
        id: 0,
        ..Default::default()
    };

    info!(documents = total, "Starting sequential extraction");

    for task in &work_set.tasks {
        report.dispatched += 1;
        let outcome = extractor.run(task);

        report.completed += 1;
        summary.tasks_executed += 1;
        summary.records += outcome.records() as u64;
        if outcome.is_failure() {
            summary.failed += 1;
        }
        progress.report(report.completed);

        info!(
            document = %task.file_name(),
            outcome = outcome.label(),
            completed = report.completed,
            total,
            "Document completed"
        );
        report.record(task, &outcome);
    }

    report.per_worker.push(summary);
    report.duration = start.elapsed();
    report.state = RunState::Done;

    info!(
        completed = report.completed,
        extracted = report.extracted,
        failed = report.failed,
        duration_secs = report.duration.as_secs_f64(),
        "Extraction complete"
    );

    report
}
