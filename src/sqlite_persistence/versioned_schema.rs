use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Offset added to the schema version before it is written to
/// `PRAGMA user_version`, so a database created by an unrelated tool
/// (user_version 0, 1, ...) is not mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 150;

pub struct Table {
    pub name: &'static str,
    pub schema: &'static str,
    pub indices: &'static [&'static str],
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
    pub validate: fn(&Connection) -> Result<()>,
}

impl VersionedSchema {
    fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        for table in self.tables {
            conn.execute(table.schema, [])?;
            for index in table.indices {
                conn.execute(index, [])?;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }
}

/// Opens the database at `db_path`, creating it at the latest schema version
/// if missing, validating and migrating it forward if present.
pub fn open_versioned<T: AsRef<Path>>(
    db_path: T,
    schemas: &'static [VersionedSchema],
) -> Result<Connection> {
    let conn = if db_path.as_ref().exists() {
        Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    } else {
        let conn = Connection::open(db_path)?;
        schemas
            .last()
            .context("No schema versions defined")?
            .create(&conn)?;
        conn
    };

    let raw_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, usize>(0))
        .context("Failed to read database version")?;
    if raw_version < BASE_DB_VERSION {
        bail!(
            "Database version {} does not look like one of ours",
            raw_version
        );
    }
    let version = raw_version - BASE_DB_VERSION;

    if version >= schemas.len() {
        bail!("Database version {} is too new", version);
    }
    (schemas
        .get(version)
        .context("Failed to get schema")?
        .validate)(&conn)?;

    migrate_if_needed(&conn, version, schemas)?;

    Ok(conn)
}

fn migrate_if_needed(
    conn: &Connection,
    version: usize,
    schemas: &'static [VersionedSchema],
) -> Result<()> {
    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(conn)?;
            latest_from = schema.version;
        }
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
        [],
    )?;

    Ok(())
}

/// Checks that `table` has exactly the expected column names, in order.
pub fn validate_columns(conn: &Connection, table: &str, expected: &[&str]) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(1))?
        .collect::<Result<_, _>>()?;

    if columns != expected {
        bail!(
            "Schema validation failed for {} table, found {:?}",
            table,
            columns
        );
    }
    Ok(())
}
