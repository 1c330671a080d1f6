//! Per-document SQLite output store
//!
//! Layout: `<root>/<key>.db`. A write goes to `<key>.db.partial` inside a
//! single transaction and is renamed over `<key>.db` only after the
//! connection is closed, so `exists` never sees a half-written output and
//! an interrupted run leaves nothing that would be mistaken for a finished
//! document.

use crate::error::{StoreError, StoreResult};
use crate::pipeline::{Record, RecordSet};
use crate::store::schema::{self, keys};
use crate::store::{OutputKey, OutputStore};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const OUTPUT_EXT: &str = "db";
const PARTIAL_EXT: &str = "db.partial";

/// Output store writing one SQLite database per document
#[derive(Debug, Clone)]
pub struct SqliteStore {
    root: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) an output directory
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|e| StoreError::CreateFailed {
                path: root.clone(),
                source: e,
            })?;
            debug!(path = %root.display(), "Created output directory");
        }
        Ok(Self { root })
    }

    /// Output directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of a document's output
    pub fn path_for(&self, key: &OutputKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, OUTPUT_EXT))
    }

    fn partial_path_for(&self, key: &OutputKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, PARTIAL_EXT))
    }

    /// Read back a committed output
    pub fn read(&self, key: &OutputKey) -> StoreResult<Option<RecordSet>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare("SELECT model, section, data FROM records ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = RecordSet::new();
        for row in rows {
            let (model, section, data) = row?;
            let fields: BTreeMap<String, String> = serde_json::from_str(&data)?;
            records.push(Record {
                model,
                fields,
                section: section as usize,
            });
        }

        Ok(Some(records))
    }

    /// Keys of all committed outputs, sorted
    pub fn keys(&self) -> StoreResult<Vec<OutputKey>> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::CreateFailed {
            path: self.root.clone(),
            source: e,
        })?;

        let mut keys: Vec<OutputKey> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(OUTPUT_EXT))
            .map(|path| OutputKey::from_path(&path))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn write_partial(&self, partial: &Path, key: &OutputKey, records: &RecordSet) -> StoreResult<()> {
        let mut conn = Connection::open(partial)?;
        schema::create_database(&conn)?;

        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO records (model, section, data) VALUES (?1, ?2, ?3)")?;
            for record in records {
                let data = serde_json::to_string(&record.fields)?;
                stmt.execute(params![record.model, record.section as i64, data])?;
            }
        }

        schema::set_extract_info(&tx, keys::DOCUMENT_KEY, key.as_str())?;
        schema::set_extract_info(&tx, keys::RECORD_COUNT, &records.len().to_string())?;
        schema::set_extract_info(&tx, keys::WRITTEN_AT, &chrono::Utc::now().to_rfc3339())?;
        schema::set_extract_info(&tx, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_extract_info(&tx, keys::EXTRACTOR_VERSION, env!("CARGO_PKG_VERSION"))?;
        tx.commit()?;

        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        Ok(())
    }
}

impl OutputStore for SqliteStore {
    fn exists(&self, key: &OutputKey) -> bool {
        self.path_for(key).is_file()
    }

    fn write(&self, key: &OutputKey, records: &RecordSet) -> StoreResult<()> {
        let partial = self.partial_path_for(key);
        let target = self.path_for(key);

        // Leftover from an interrupted run
        if partial.exists() {
            if let Err(e) = fs::remove_file(&partial) {
                warn!(path = %partial.display(), error = %e, "Failed to remove stale partial output");
            }
        }

        if let Err(e) = self.write_partial(&partial, key, records) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::rename(&partial, &target).map_err(|e| {
            let _ = fs::remove_file(&partial);
            StoreError::CommitFailed {
                path: target.clone(),
                source: e,
            }
        })?;

        debug!(key = %key, records = records.len(), path = %target.display(), "Output committed");
        Ok(())
    }
}
