//! Progress reporting for extraction runs
//!
//! The coordinator reports the number of completed documents once per
//! completion through a [`ProgressSink`]. Reporting is fire-and-forget: a
//! sink never blocks or fails the run.

use crate::dispatch::RunReport;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;

/// Receiver of the monotonic completed-document count
pub trait ProgressSink: Send + Sync {
    /// Called once per completion, success or not
    fn report(&self, completed: u64);
}

/// Sink that discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _completed: u64) {}
}

/// Sink that logs progress through tracing
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    total: u64,
}

impl LogProgress {
    pub fn new(total: u64) -> Self {
        Self { total }
    }
}

impl ProgressSink for LogProgress {
    fn report(&self, completed: u64) {
        info!(papers_processed = completed, total = self.total, "Progress");
    }
}

/// Progress bar over the work set
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a progress bar for `total` documents
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);

        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} documents ({per_sec}, eta {eta}) {msg}",
                )
                .expect("Invalid progress template")
                .progress_chars("=> ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, completed: u64) {
        self.bar.set_position(completed);
    }
}

/// Format a number with thousands separators
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(corpus: &str, workers: usize, output: &str, cache: Option<&str>) {
    println!();
    println!(
        "{} {}",
        style("corpus-extract").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Corpus:").bold(), corpus);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output);
    if let Some(cache) = cache {
        println!("  {} {}", style("Cache:").bold(), cache);
    }
    println!();
}

/// Print the work set breakdown before dispatch starts
pub fn print_work_set(pending: usize, already_done: usize, auxiliary: usize) {
    println!(
        "  {} {} pending, {} already extracted, {} ignored",
        style("Documents:").bold(),
        format_number(pending as u64),
        format_number(already_done as u64),
        format_number(auxiliary as u64),
    );
    println!();
}

/// Print a summary of the run
pub fn print_summary(report: &RunReport, output: &str) {
    let duration_secs = report.duration.as_secs_f64();
    let rate = report.docs_per_second();

    println!();
    println!("{}", style("Extraction Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Documents:").bold(),
        format_number(report.completed)
    );
    println!(
        "  {} {}",
        style("Extracted:").bold(),
        format_number(report.extracted)
    );
    println!(
        "  {} {}",
        style("Records:").bold(),
        format_number(report.records)
    );
    if report.rejected > 0 {
        println!(
            "  {} {}",
            style("Rejected:").bold(),
            format_number(report.rejected)
        );
    }
    if report.skipped > 0 {
        println!(
            "  {} {}",
            style("Skipped:").bold(),
            format_number(report.skipped)
        );
    }
    if report.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(report.failed)
        );
    }
    println!(
        "  {} {:.1}s ({:.2} docs/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_null_and_log_sinks_accept_reports() {
        let sinks: Vec<Box<dyn ProgressSink>> =
            vec![Box::new(NullProgress), Box::new(LogProgress::new(3))];
        for sink in &sinks {
            sink.report(1);
            sink.report(2);
        }
    }
}
