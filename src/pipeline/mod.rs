//! Single-document extraction pipeline
//!
//! The coordinator treats the pipeline as a black box: `parse` turns a
//! corpus file into a [`Document`], `extract` turns a document into a
//! [`RecordSet`]. Either step may fail; the execution wrapper is the only
//! caller and the only place those failures are caught.
//!
//! Splitting parse from extract lets the parsed-document cache skip the
//! expensive parse on re-runs.

pub mod pattern;
pub mod types;

pub use pattern::{PatternPipeline, RecordModel};
pub use types::{Document, Record, RecordSet, Section};

use crate::error::PipelineResult;
use std::path::Path;

/// An opaque per-document extraction pipeline
///
/// Implementations are shared by every worker thread, so they must be
/// `Send + Sync`. Each call handles exactly one document.
pub trait Pipeline: Send + Sync {
    /// Parse a corpus file into a document
    fn parse(&self, path: &Path) -> PipelineResult<Document>;

    /// Extract records from a parsed (or cache-hydrated) document
    fn extract(&self, document: &Document) -> PipelineResult<RecordSet>;
}
