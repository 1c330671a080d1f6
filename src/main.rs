//! corpus-extract - Parallel, Resumable Corpus Extraction
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use corpus_extract::cache::DiskCache;
use corpus_extract::config::{CliArgs, ExtractConfig};
use corpus_extract::corpus::enumerate;
use corpus_extract::dispatch::{self, Extractor};
use corpus_extract::pipeline::{PatternPipeline, RecordSet};
use corpus_extract::progress::{
    print_header, print_summary, print_work_set, LogProgress, ProgressReporter, ProgressSink,
};
use corpus_extract::store::SqliteStore;
use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Per-document logs would fight the progress bar
    setup_logging(args.verbose, !args.quiet)?;

    // Validate and create config
    let config = ExtractConfig::from_args(args).context("Invalid configuration")?;

    let output = config.output_dir.display().to_string();
    let cache_label = config.cache_dir.as_ref().map(|p| p.display().to_string());

    if config.show_progress {
        print_header(
            &config.corpus_dir.display().to_string(),
            config.worker_count,
            &output,
            cache_label.as_deref(),
        );
    }

    let store = Arc::new(
        SqliteStore::open(&config.output_dir).context("Failed to open output directory")?,
    );

    let work_set = enumerate(
        &config.corpus_dir,
        store.as_ref(),
        &config.corpus_filter(),
        config.limit,
    )
    .context("Failed to enumerate corpus")?;

    if config.show_progress {
        print_work_set(
            work_set.len(),
            work_set.already_done,
            work_set.auxiliary + work_set.duplicate_keys,
        );
    }

    let extractor = build_extractor(&config, store)?;

    let total = work_set.len() as u64;
    let reporter = config.show_progress.then(|| ProgressReporter::new(total));
    let log_progress = LogProgress::new(total);
    let progress: &dyn ProgressSink = match &reporter {
        Some(bar) => bar,
        None => &log_progress,
    };

    let report = dispatch::run(work_set, extractor, config.worker_count, progress)
        .context("Extraction run failed")?;

    if let Some(bar) = &reporter {
        bar.finish_and_clear();
    }

    for path in &report.failures {
        warn!(path = %path.display(), "Document failed; no output written");
    }

    if config.show_progress {
        print_summary(&report, &output);
    }

    Ok(())
}

fn build_extractor(config: &ExtractConfig, store: Arc<SqliteStore>) -> Result<Extractor> {
    let pipeline = Arc::new(PatternPipeline::new(config.models.clone()));
    let mut extractor = Extractor::new(pipeline, store);

    if let Some(dir) = &config.cache_dir {
        let cache = DiskCache::open(dir).context("Failed to open cache directory")?;
        extractor = extractor.with_cache(Arc::new(cache));
    }

    if let Some(min_chars) = config.min_chars {
        extractor = extractor.with_document_filter(move |doc| doc.text_len() >= min_chars);
    }

    if config.dedupe {
        extractor = extractor.with_record_filter(dedupe_records);
    }

    Ok(extractor)
}

fn dedupe_records(records: RecordSet) -> RecordSet {
    let mut seen = HashSet::new();
    records
        .into_inner()
        .into_iter()
        .filter(|r| seen.insert((r.model.clone(), r.fields.clone())))
        .collect()
}

fn setup_logging(verbose: bool, progress_bar: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("corpus_extract=debug,warn")
    } else if progress_bar {
        EnvFilter::new("corpus_extract=warn")
    } else {
        EnvFilter::new("corpus_extract=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
