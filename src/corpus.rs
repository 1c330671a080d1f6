//! Corpus enumeration
//!
//! Builds the work set for a run: every document in the corpus directory
//! that is not an auxiliary file and does not already have an output. The
//! output store is the only resume state, so re-running after a crash only
//! offers documents that were never persisted.

use crate::error::CorpusError;
use crate::store::{OutputKey, OutputStore};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name fragment of the record dumps that live next to documents
const RECORDS_DUMP_MARKER: &str = "records.txt";

/// One unit of work: a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Position in the enumeration order
    pub id: usize,

    /// Full path to the document
    pub path: PathBuf,

    /// Key of the document's output
    pub key: OutputKey,
}

impl Task {
    /// Create a task for a document path
    pub fn new(id: usize, path: PathBuf) -> Self {
        let key = OutputKey::from_path(&path);
        Self { id, path, key }
    }

    /// Document file name, for logs
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.path.display())
    }
}

/// Name-based predicate for files that are not documents
#[derive(Debug, Clone, Default)]
pub struct CorpusFilter {
    exclude_patterns: Vec<Regex>,
}

impl CorpusFilter {
    /// Create a filter with extra exclude patterns
    pub fn new(exclude_patterns: Vec<Regex>) -> Self {
        Self { exclude_patterns }
    }

    /// Returns true if the file is never a processable document
    pub fn is_auxiliary(&self, name: &str) -> bool {
        name.starts_with('.')
            || name.contains(RECORDS_DUMP_MARKER)
            || self.exclude_patterns.iter().any(|re| re.is_match(name))
    }
}

/// The resumable work set for one run
#[derive(Debug, Clone, Default)]
pub struct WorkSet {
    /// Tasks in dispatch order
    pub tasks: Vec<Task>,

    /// Regular files found in the corpus directory
    pub listed: usize,

    /// Files dropped as auxiliary
    pub auxiliary: usize,

    /// Documents dropped because their output already exists
    pub already_done: usize,

    /// Documents dropped because an earlier file maps to the same output key
    pub duplicate_keys: usize,

    /// Documents dropped by the limit
    pub over_limit: usize,
}

impl WorkSet {
    /// Build a work set directly from paths, in the given order
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let tasks: Vec<Task> = paths
            .into_iter()
            .enumerate()
            .map(|(id, path)| Task::new(id, path))
            .collect();
        Self {
            listed: tasks.len(),
            tasks,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Enumerate the work set for a corpus directory
///
/// Documents are ordered by file name. Output keys must be unique: when two
/// files share a key (`paper.html`, `paper.txt`) only the first is kept.
/// `limit` caps the number of tasks after auxiliary, duplicate and
/// already-extracted documents are removed.
pub fn enumerate(
    corpus_dir: &Path,
    store: &dyn OutputStore,
    filter: &CorpusFilter,
    limit: Option<usize>,
) -> Result<WorkSet, CorpusError> {
    if !corpus_dir.exists() {
        return Err(CorpusError::NotFound {
            path: corpus_dir.to_path_buf(),
        });
    }
    if !corpus_dir.is_dir() {
        return Err(CorpusError::NotADirectory {
            path: corpus_dir.to_path_buf(),
        });
    }

    let read_err = |e| CorpusError::ReadDir {
        path: corpus_dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(corpus_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut work_set = WorkSet {
        listed: files.len(),
        ..Default::default()
    };

    let mut seen: HashMap<OutputKey, PathBuf> = HashMap::new();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if filter.is_auxiliary(&name) {
            work_set.auxiliary += 1;
            continue;
        }

        let key = OutputKey::from_path(&path);
        if let Some(first) = seen.get(&key) {
            warn!(
                key = %key,
                kept = %first.display(),
                dropped = %path.display(),
                "Skipping document, output key already taken"
            );
            work_set.duplicate_keys += 1;
            continue;
        }
        seen.insert(key.clone(), path.clone());

        if store.exists(&key) {
            debug!(file = %name, key = %key, "Skipping document, output already exists");
            work_set.already_done += 1;
            continue;
        }

        if limit.is_some_and(|max| work_set.tasks.len() >= max) {
            work_set.over_limit += 1;
            continue;
        }

        let id = work_set.tasks.len();
        work_set.tasks.push(Task::new(id, path));
    }

    info!(
        listed = work_set.listed,
        pending = work_set.tasks.len(),
        already_done = work_set.already_done,
        auxiliary = work_set.auxiliary,
        duplicate_keys = work_set.duplicate_keys,
        "Corpus enumerated"
    );

    Ok(work_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RecordSet;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"text").unwrap();
    }

    #[test]
    fn test_auxiliary_filter() {
        let filter = CorpusFilter::new(vec![Regex::new(r"\.log$").unwrap()]);
        assert!(filter.is_auxiliary(".DS_Store"));
        assert!(filter.is_auxiliary("paper_records.txt"));
        assert!(filter.is_auxiliary("run.log"));
        assert!(!filter.is_auxiliary("paper.html"));
    }

    #[test]
    fn test_enumerate_order_and_filters() {
        let dir = tempdir().unwrap();
        for name in ["c.txt", "a.txt", ".hidden", "b.html", "b_records.txt"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let store = MemoryStore::new();
        store.insert(OutputKey::new("b"), RecordSet::new());

        let ws = enumerate(dir.path(), &store, &CorpusFilter::default(), None).unwrap();
        let names: Vec<_> = ws.tasks.iter().map(|t| t.file_name()).collect();

        assert_eq!(names, vec!["a.txt", "c.txt"]);
        assert_eq!(ws.listed, 5);
        assert_eq!(ws.auxiliary, 2);
        assert_eq!(ws.already_done, 1);
        assert_eq!(ws.tasks[1].id, 1);
        assert_eq!(ws.tasks[1].key.as_str(), "c");
    }

    #[test]
    fn test_enumerate_drops_duplicate_keys() {
        let dir = tempdir().unwrap();
        for name in ["paper.txt", "paper.html", "other.txt"] {
            touch(dir.path(), name);
        }

        let ws = enumerate(dir.path(), &MemoryStore::new(), &CorpusFilter::default(), None).unwrap();
        let names: Vec<_> = ws.tasks.iter().map(|t| t.file_name()).collect();

        assert_eq!(names, vec!["other.txt", "paper.html"]);
        assert_eq!(ws.duplicate_keys, 1);
    }

    #[test]
    fn test_duplicate_of_finished_document_is_not_pending() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "paper.html");
        touch(dir.path(), "paper.txt");

        let store = MemoryStore::new();
        store.insert(OutputKey::new("paper"), RecordSet::new());

        let ws = enumerate(dir.path(), &store, &CorpusFilter::default(), None).unwrap();
        assert!(ws.is_empty());
        assert_eq!(ws.already_done, 1);
        assert_eq!(ws.duplicate_keys, 1);
    }

    #[test]
    fn test_enumerate_limit() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path(), &format!("doc{}.txt", i));
        }

        let ws = enumerate(dir.path(), &MemoryStore::new(), &CorpusFilter::default(), Some(2)).unwrap();
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.over_limit, 3);
    }

    #[test]
    fn test_enumerate_missing_dir() {
        let err = enumerate(
            Path::new("/no/such/corpus"),
            &MemoryStore::new(),
            &CorpusFilter::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::NotFound { .. }));
    }

    #[test]
    fn test_enumerate_file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "single.txt");
        let err = enumerate(
            &dir.path().join("single.txt"),
            &MemoryStore::new(),
            &CorpusFilter::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::NotADirectory { .. }));
    }
}
