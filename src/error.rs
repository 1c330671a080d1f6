//! Error types for corpus-extract
//!
//! This module defines the error hierarchy that covers:
//! - Corpus enumeration errors (fatal at startup)
//! - Pipeline, output store and cache errors (per-document, isolated)
//! - Configuration and CLI errors
//! - Worker/transport errors (fatal to the run)
//!
//! Per-document errors never cross the worker boundary as `Err`; they are
//! folded into an [`ExtractOutcome::Failed`] by the execution wrapper.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for an extraction run
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Corpus could not be enumerated
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Output store errors
    #[error("Output store error: {0}")]
    Store(#[from] StoreError),

    /// Parsed-document cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Extraction pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/transport errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while listing the corpus
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus directory does not exist
    #[error("Corpus directory '{path}' does not exist")]
    NotFound { path: PathBuf },

    /// Corpus path is not a directory
    #[error("Corpus path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Directory listing failed
    #[error("Failed to read corpus directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the single-document pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Document could not be read from disk
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document content could not be parsed
    #[error("Failed to parse document '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Extraction over a parsed document failed
    #[error("Extraction failed for '{path}': {reason}")]
    Extract { path: PathBuf, reason: String },

    /// The pipeline panicked while processing a document
    #[error("Pipeline panicked on '{path}': {message}")]
    Panicked { path: PathBuf, message: String },
}

/// Output store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to create the output location
    #[error("Failed to create output at '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a finished output into place
    #[error("Failed to commit output '{path}': {source}")]
    CommitFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema error
    #[error("Output schema error: {0}")]
    Schema(String),
}

/// Parsed-document cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache file could not be read or written
    #[error("Cache I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cached document could not be decoded or encoded
    #[error("Cache entry '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid document limit
    #[error("Invalid document limit {limit}: must be at least 1")]
    InvalidLimit { limit: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Invalid record model definition
    #[error("Invalid record model '{spec}': {reason}")]
    InvalidModel { spec: String, reason: String },

    /// Corpus path error
    #[error("Invalid corpus directory '{path}': {reason}")]
    InvalidCorpusDir { path: PathBuf, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Worker and transport errors
///
/// All of these are fatal to the run: there is no heartbeat or
/// reassignment, a broken worker stops the coordinator.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked outside the execution wrapper
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Coordinator could not deliver an assignment
    #[error("Failed to send assignment to worker {id}: channel closed")]
    AssignmentSendFailed { id: usize },

    /// Worker's assignment channel closed before it was told to exit
    #[error("Assignment channel for worker {id} closed unexpectedly")]
    AssignmentChannelClosed { id: usize },

    /// Worker's completion channel closed
    #[error("Completion channel for worker {id} closed unexpectedly")]
    CompletionChannelClosed { id: usize },

    /// A completion did not match the task held by the slot
    #[error("Worker {id} completed task {got} while holding task {expected:?}")]
    UnexpectedCompletion {
        id: usize,
        got: usize,
        expected: Option<usize>,
    },

    /// Work remains outstanding but no worker holds a task
    #[error("Dispatch stalled: {completed} of {total} tasks completed and no worker is busy")]
    Stalled { completed: u64, total: u64 },
}

/// Result type alias for ExtractError
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Result type alias for PipelineError
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for CacheError
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Represents the outcome of running one task through the execution wrapper
#[derive(Debug)]
pub enum ExtractOutcome {
    /// Records were extracted and persisted (possibly zero of them)
    Extracted { records: usize, cache_hit: bool },

    /// Document failed the validity check; an empty record set was persisted
    Rejected,

    /// Output already existed when the task ran
    Skipped { reason: String },

    /// Processing failed; nothing was persisted
    Failed { error: ExtractError },
}

impl ExtractOutcome {
    /// Returns true if this outcome persisted an output
    pub fn is_persisted(&self) -> bool {
        matches!(
            self,
            ExtractOutcome::Extracted { .. } | ExtractOutcome::Rejected
        )
    }

    /// Returns true if this outcome represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, ExtractOutcome::Failed { .. })
    }

    /// Number of records persisted by this outcome
    pub fn records(&self) -> usize {
        match self {
            ExtractOutcome::Extracted { records, .. } => *records,
            _ => 0,
        }
    }

    /// Short label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            ExtractOutcome::Extracted { .. } => "extracted",
            ExtractOutcome::Rejected => "rejected",
            ExtractOutcome::Skipped { .. } => "skipped",
            ExtractOutcome::Failed { .. } => "failed",
        }
    }
}
