use crate::sqlite_persistence::{open_versioned, validate_columns, Table, VersionedSchema};
use crate::storage::StorageBackend;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// V 0
const RECORD_TABLE_V_0: Table = Table {
    name: "record",
    schema: "CREATE TABLE record (key TEXT NOT NULL UNIQUE, value TEXT NOT NULL, updated INTEGER DEFAULT (cast(strftime('%s','now') as int)), PRIMARY KEY (key));",
    indices: &[],
};

fn validate_schema_0(conn: &Connection) -> Result<()> {
    validate_columns(conn, RECORD_TABLE_V_0.name, &["key", "value", "updated"])
}

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[RECORD_TABLE_V_0],
    migration: None,
    validate: validate_schema_0,
}];

/// [`StorageBackend`] over a single-table SQLite database, for hosts that
/// want the session to survive a restart.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl StorageBackend for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM record WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO record (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated = cast(strftime('%s','now') as int)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM record WHERE key = ?1", params![key])?;
        Ok(())
    }
}
