//! corpus-extract - Parallel, Resumable Corpus Extraction
//!
//! Runs every document in a corpus directory through an extraction
//! pipeline and persists one record set per document. Designed for long
//! batch runs where individual documents are malformed and the run itself
//! may be interrupted.
//!
//! # Features
//!
//! - **Fault Isolation**: A document that fails to parse or extract, or
//!   whose pipeline panics, is logged and left without output. Nothing a
//!   single document does stops the run.
//!
//! - **Resumable**: The output store is the only progress record. A
//!   re-run enumerates only documents with no output, so restarting after
//!   a crash picks up where the last run stopped.
//!
//! - **Dynamic Load Balancing**: Workers receive one document at a time and
//!   get the next only after reporting the last, so slow documents never
//!   hold up a queue of fast ones.
//!
//! - **Parse Cache**: Parsed documents can be cached on disk so a re-run
//!   skips straight to extraction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Corpus Directory                            │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ enumerate (skip auxiliary + done)
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │       WorkSet        │
//!                    └──────────┬───────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Coordinator                               │
//! │   Priming ──▶ Steady ──▶ Draining ──▶ Done                       │
//! │       │  one Assignment out per Completion in                    │
//! │  ┌────┴────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐      │
//! │  │Worker 0 │  │Worker 1 │  │Worker 2 │  ...    │Worker N │      │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘      │
//! │       └────────────┴─── Extractor ──────────────────┘           │
//! │              cache ─▶ parse ─▶ filter ─▶ extract ─▶ write        │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │     OutputStore      │
//!                    │  (<name>.db per doc) │
//!                    └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use corpus_extract::corpus::{enumerate, CorpusFilter};
//! use corpus_extract::dispatch::{self, Extractor};
//! use corpus_extract::pipeline::{PatternPipeline, RecordModel};
//! use corpus_extract::progress::NullProgress;
//! use corpus_extract::store::SqliteStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::open("extracted")?);
//! let model = RecordModel::parse(r"year=(?P<year>\d{4})")?;
//! let pipeline = Arc::new(PatternPipeline::new(vec![model]));
//!
//! let work_set = enumerate(Path::new("papers"), store.as_ref(), &CorpusFilter::default(), None)?;
//! let extractor = Extractor::new(pipeline, store);
//! let report = dispatch::run(work_set, extractor, 8, &NullProgress)?;
//!
//! println!("{} documents, {} failed", report.completed, report.failed);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod corpus;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use config::{CliArgs, ExtractConfig};
pub use dispatch::{Extractor, RunReport};
pub use error::{ExtractError, ExtractOutcome, Result};
