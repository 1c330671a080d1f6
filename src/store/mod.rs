//! Output store
//!
//! One output per document, addressed by the document's [`OutputKey`].
//! The store is both the persistence target of the execution wrapper and
//! the only source of resume state: a document whose key already `exists`
//! is left out of the next run's work set.
//!
//! # Implementations
//!
//! - [`SqliteStore`]: one SQLite file per document under an output
//!   directory, committed by rename so partial outputs are never visible
//! - [`MemoryStore`]: in-process map, for tests and embedding

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::pipeline::RecordSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Key identifying one document's output
///
/// Derived from the document's file name with the final extension removed,
/// so `corpus/paper-01.html` maps to `paper-01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputKey(String);

impl OutputKey {
    /// Create a key from a raw string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the output key for a document path
    pub fn from_path(path: &Path) -> Self {
        let key = path
            .file_stem()
            .or_else(|| path.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistent per-document output
///
/// Shared by every worker; each call touches only the given key, and the
/// coordinator never hands the same key to two workers.
pub trait OutputStore: Send + Sync {
    /// Returns true if a complete output exists for this key
    fn exists(&self, key: &OutputKey) -> bool;

    /// Persist a record set, replacing any previous output for the key
    ///
    /// Either the whole record set becomes visible or nothing does.
    fn write(&self, key: &OutputKey, records: &RecordSet) -> StoreResult<()>;
}

/// In-memory output store
#[derive(Debug, Default)]
pub struct MemoryStore {
    outputs: Mutex<HashMap<OutputKey, RecordSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an output, as if written by an earlier run
    pub fn insert(&self, key: OutputKey, records: RecordSet) {
        self.outputs.lock().insert(key, records);
    }

    /// Fetch a copy of a stored record set
    pub fn get(&self, key: &OutputKey) -> Option<RecordSet> {
        self.outputs.lock().get(key).cloned()
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<OutputKey> {
        let mut keys: Vec<_> = self.outputs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.lock().is_empty()
    }
}

impl OutputStore for MemoryStore {
    fn exists(&self, key: &OutputKey) -> bool {
        self.outputs.lock().contains_key(key)
    }

    fn write(&self, key: &OutputKey, records: &RecordSet) -> StoreResult<()> {
        self.outputs.lock().insert(key.clone(), records.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Record;

    #[test]
    fn test_output_key_from_path() {
        assert_eq!(OutputKey::from_path(Path::new("/c/paper-01.html")).as_str(), "paper-01");
        assert_eq!(OutputKey::from_path(Path::new("a.b.txt")).as_str(), "a.b");
        assert_eq!(OutputKey::from_path(Path::new("noext")).as_str(), "noext");
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        let key = OutputKey::new("doc");
        assert!(!store.exists(&key));

        store.write(&key, &RecordSet::new()).unwrap();
        assert!(store.exists(&key));
        assert!(store.get(&key).unwrap().is_empty());

        let one: RecordSet = vec![Record::new("m", 0).with_field("f", "v")].into();
        store.write(&key, &one).unwrap();
        assert_eq!(store.get(&key).unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }
}
