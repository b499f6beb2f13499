//! SQLite schema for the segment cache.
//!
//! Tables:
//! - `dict_data`: one row per fetched segment, keyed by URL

use rusqlite::Connection;

use crate::error::{LoaderError, LoaderResult};

/// Current schema version (`PRAGMA user_version`).
pub const SCHEMA_VERSION: i64 = 1;

/// DDL for the segment cache.
///
/// Schema version: 1
pub const CACHE_SCHEMA: &str = r#"
-- Segment bytes (immutable after insert)
CREATE TABLE IF NOT EXISTS dict_data (
    url   TEXT PRIMARY KEY,
    data  BLOB NOT NULL
);
"#;

/// Bring a freshly opened connection up to `SCHEMA_VERSION`.
pub(crate) fn migrate(conn: &Connection) -> LoaderResult<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| LoaderError::store_open(format!("failed to read schema version: {}", e)))?;

    if version > SCHEMA_VERSION {
        return Err(LoaderError::store_open(format!(
            "cache schema version {} is newer than supported {}",
            version, SCHEMA_VERSION
        )));
    }

    if version < SCHEMA_VERSION {
        conn.execute_batch(CACHE_SCHEMA)
            .map_err(|e| LoaderError::store_open(format!("failed to create cache table: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| LoaderError::store_open(format!("failed to set schema version: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CACHE_SCHEMA).unwrap();
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO dict_data (url, data) VALUES (?1, ?2)",
            rusqlite::params!["https://host/dict/base.dat", vec![1u8, 2, 3]],
        )
        .unwrap();

        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM dict_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        let err = migrate(&conn).unwrap_err();
        assert!(matches!(err, LoaderError::StoreOpen { .. }));
    }
}
