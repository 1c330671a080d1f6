//! Output database schema definitions and creation
//!
//! Each document gets its own SQLite file holding its records and a small
//! metadata table describing how and when it was written.

use crate::error::StoreResult;
use rusqlite::Connection;

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the records table
/// `data` holds the JSON-encoded record fields.
const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    model TEXT NOT NULL,
    section INTEGER NOT NULL,
    data TEXT NOT NULL
)
"#;

/// SQL to create extraction metadata table
const CREATE_EXTRACT_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS extract_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

const CREATE_INDEXES: &[&str] = &["CREATE INDEX IF NOT EXISTS idx_records_model ON records(model)"];

/// Pragmas for a short-lived single-writer file
///
/// The file is written once under a temporary name and renamed into place,
/// so rollback journaling is enough and WAL side files are avoided.
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = DELETE;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
"#;

/// Create and configure a new output database
pub fn create_database(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;

    conn.execute(CREATE_RECORDS_TABLE, [])?;
    conn.execute(CREATE_EXTRACT_INFO_TABLE, [])?;

    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }

    Ok(())
}

/// Store extraction metadata
pub fn set_extract_info(conn: &Connection, key: &str, value: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO extract_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get extraction metadata
pub fn get_extract_info(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM extract_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys written with every output
pub mod keys {
    /// Output key of the document
    pub const DOCUMENT_KEY: &str = "document_key";

    /// Number of records written
    pub const RECORD_COUNT: &str = "record_count";

    /// Timestamp when the output was written (RFC 3339)
    pub const WRITTEN_AT: &str = "written_at";

    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Tool version
    pub const EXTRACTOR_VERSION: &str = "extractor_version";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_database() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"extract_info".to_string()));
    }

    #[test]
    fn test_extract_info_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        create_database(&conn).unwrap();

        set_extract_info(&conn, keys::RECORD_COUNT, "3").unwrap();
        assert_eq!(
            get_extract_info(&conn, keys::RECORD_COUNT).unwrap(),
            Some("3".to_string())
        );

        set_extract_info(&conn, keys::RECORD_COUNT, "4").unwrap();
        assert_eq!(
            get_extract_info(&conn, keys::RECORD_COUNT).unwrap(),
            Some("4".to_string())
        );

        assert_eq!(get_extract_info(&conn, "missing").unwrap(), None);
    }
}
