//! Parsed-document cache
//!
//! Lets a re-run skip the parse step for documents that were parsed
//! before. The cache is purely an optimization: a miss or an unreadable
//! entry falls back to a full parse, and a failed store never fails the
//! document.

use crate::error::{CacheError, CacheResult};
use crate::pipeline::Document;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cache of parsed documents keyed by source path
pub trait DocumentCache: Send + Sync {
    /// Load a previously parsed document, `None` on a miss
    fn hydrate(&self, path: &Path) -> CacheResult<Option<Document>>;

    /// Save a freshly parsed document, replacing any previous entry
    fn store(&self, path: &Path, document: &Document) -> CacheResult<()>;
}

/// Cache storing one JSON file per source document
///
/// Entries live at `<root>/<source file name>.json`.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory
    pub fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::Io {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the cache entry for a source document
    pub fn entry_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string_lossy().replace('/', "_"));
        self.root.join(format!("{}.json", name))
    }
}

impl DocumentCache for DiskCache {
    fn hydrate(&self, path: &Path) -> CacheResult<Option<Document>> {
        let entry = self.entry_path(path);
        let data = match fs::read(&entry) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path: entry, source: e }),
        };

        let mut document: Document = serde_json::from_slice(&data)
            .map_err(|e| CacheError::Corrupt { path: entry, source: e })?;

        // The corpus may have moved since the entry was written
        document.source = path.to_path_buf();
        Ok(Some(document))
    }

    fn store(&self, path: &Path, document: &Document) -> CacheResult<()> {
        let entry = self.entry_path(path);
        let tmp = entry.with_extension("json.tmp");

        let data = serde_json::to_vec(document).map_err(|e| CacheError::Corrupt {
            path: entry.clone(),
            source: e,
        })?;

        fs::write(&tmp, data).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &entry).map_err(|e| CacheError::Io { path: entry, source: e })?;

        Ok(())
    }
}
