use crate::registry::{RegistryUser, UserRegistry};
use crate::sqlite_persistence::{open_versioned, validate_columns, Table, VersionedSchema};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    schema: "CREATE TABLE user (id TEXT NOT NULL UNIQUE, email TEXT NOT NULL UNIQUE, record TEXT NOT NULL, created INTEGER DEFAULT (cast(strftime('%s','now') as int)), PRIMARY KEY (id));",
    indices: &["CREATE INDEX user_email_index ON user (email);"],
};

fn validate_schema_0(conn: &Connection) -> Result<()> {
    validate_columns(conn, USER_TABLE_V_0.name, &["id", "email", "record", "created"])
}

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USER_TABLE_V_0],
    migration: None,
    validate: validate_schema_0,
}];

/// SQLite-backed [`UserRegistry`], for installs where registered users
/// should survive a restart. The full record is stored as a JSON document
/// next to the indexed lookup columns.
#[derive(Clone)]
pub struct SqliteUserRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserRegistry {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserRegistry {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn find_by_column(&self, column: &str, value: &str) -> Result<Option<RegistryUser>> {
        let conn = self.conn.lock().unwrap();
        let record: Option<String> = conn
            .query_row(
                &format!("SELECT record FROM user WHERE {} = ?1", column),
                params![value],
                |row| row.get(0),
            )
            .optional()?;
        match record {
            Some(record) => Ok(Some(
                serde_json::from_str(&record)
                    .with_context(|| format!("Malformed user record for {} {}", column, value))?,
            )),
            None => Ok(None),
        }
    }
}

impl UserRegistry for SqliteUserRegistry {
    fn find_by_email(&self, email: &str) -> Result<Option<RegistryUser>> {
        self.find_by_column("email", email)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<RegistryUser>> {
        self.find_by_column("id", id)
    }

    fn insert(&self, user: RegistryUser) -> Result<()> {
        let record = serde_json::to_string(&user)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (id, email, record) VALUES (?1, ?2, ?3)",
            params![user.id, user.email, record],
        )
        .with_context(|| format!("Failed to insert user {}", user.email))?;
        Ok(())
    }
}
