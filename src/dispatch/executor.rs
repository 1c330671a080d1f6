//! Execution wrapper
//!
//! Runs one task end to end inside a worker:
//! - Re-checks the output store (skip if another run already wrote it)
//! - Hydrates the parsed document from the cache, or parses it
//! - Applies the optional validity hook
//! - Runs the pipeline and the optional record hook
//! - Persists the record set, then caches the freshly parsed document
//!
//! Nothing escapes [`Extractor::run`]: errors and pipeline panics become an
//! [`ExtractOutcome::Failed`] that is logged with the document path, so one
//! malformed document cannot stop the run.

use crate::cache::DocumentCache;
use crate::corpus::Task;
use crate::error::{ExtractOutcome, PipelineError, Result};
use crate::pipeline::{Document, Pipeline, RecordSet};
use crate::store::OutputStore;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Decides whether a parsed document is worth extracting
pub type DocumentFilter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Post-processes a non-empty record set before it is persisted
pub type RecordFilter = Arc<dyn Fn(RecordSet) -> RecordSet + Send + Sync>;

/// The per-task execution wrapper
///
/// Cheap to clone; every worker gets its own clone sharing the same
/// pipeline, store and cache.
#[derive(Clone)]
pub struct Extractor {
    pipeline: Arc<dyn Pipeline>,
    store: Arc<dyn OutputStore>,
    cache: Option<Arc<dyn DocumentCache>>,
    document_filter: Option<DocumentFilter>,
    record_filter: Option<RecordFilter>,
}

impl Extractor {
    /// Create a wrapper around a pipeline and an output store
    pub fn new(pipeline: Arc<dyn Pipeline>, store: Arc<dyn OutputStore>) -> Self {
        Self {
            pipeline,
            store,
            cache: None,
            document_filter: None,
            record_filter: None,
        }
    }

    /// Use a parsed-document cache
    pub fn with_cache(mut self, cache: Arc<dyn DocumentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reject documents for which the predicate returns false
    pub fn with_document_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.document_filter = Some(Arc::new(filter));
        self
    }

    /// Transform non-empty record sets before persisting them
    pub fn with_record_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(RecordSet) -> RecordSet + Send + Sync + 'static,
    {
        self.record_filter = Some(Arc::new(filter));
        self
    }

    /// The output store this wrapper persists to
    pub fn store(&self) -> &Arc<dyn OutputStore> {
        &self.store
    }

    /// Run one task; never fails and never panics
    pub fn run(&self, task: &Task) -> ExtractOutcome {
        let start = Instant::now();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.execute(task))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => {
                error!(path = %task.path.display(), error = %error, "Document failed");
                ExtractOutcome::Failed { error }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(path = %task.path.display(), panic = %message, "Pipeline panicked");
                ExtractOutcome::Failed {
                    error: PipelineError::Panicked {
                        path: task.path.clone(),
                        message,
                    }
                    .into(),
                }
            }
        };

        info!(
            path = %task.path.display(),
            outcome = outcome.label(),
            records = outcome.records(),
            took_ms = start.elapsed().as_millis() as u64,
            "Document finished"
        );

        outcome
    }

    fn execute(&self, task: &Task) -> Result<ExtractOutcome> {
        if self.store.exists(&task.key) {
            return Ok(ExtractOutcome::Skipped {
                reason: format!("output '{}' already exists", task.key),
            });
        }

        let (document, cache_hit) = self.load_document(&task.path)?;

        if let Some(filter) = &self.document_filter {
            if !filter(&document) {
                warn!(path = %task.path.display(), "Document rejected by filter");
                self.store.write(&task.key, &RecordSet::new())?;
                if !cache_hit {
                    self.cache_document(&task.path, &document);
                }
                return Ok(ExtractOutcome::Rejected);
            }
        }

        let mut records = self.pipeline.extract(&document)?;

        if let Some(filter) = &self.record_filter {
            if !records.is_empty() {
                records = filter(records);
            }
        }

        self.store.write(&task.key, &records)?;

        if !cache_hit {
            self.cache_document(&task.path, &document);
        }

        Ok(ExtractOutcome::Extracted {
            records: records.len(),
            cache_hit,
        })
    }

    /// Hydrate from the cache when possible, otherwise parse
    fn load_document(&self, path: &Path) -> Result<(Document, bool)> {
        if let Some(cache) = &self.cache {
            match cache.hydrate(path) {
                Ok(Some(document)) => {
                    debug!(path = %path.display(), "Cache hit");
                    return Ok((document, true));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cache unreadable, parsing document");
                }
            }
        }

        Ok((self.pipeline.parse(path)?, false))
    }

    fn cache_document(&self, path: &Path, document: &Document) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(path, document) {
                warn!(path = %path.display(), error = %e, "Failed to cache parsed document");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
