pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Nothing to update")]
    NothingToUpdate,
}

/// Map a constraint violation to a typed `Conflict`, leaving every other
/// SQLite failure untouched. Covers duplicate unique columns (email) and
/// RESTRICT'd foreign keys (deleting a site that users or patients still
/// reference).
pub(crate) fn constraint_conflict(err: rusqlite::Error, message: &str) -> DatabaseError {
    use rusqlite::ffi;

    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
            || e.extended_code == ffi::SQLITE_CONSTRAINT_TRIGGER
        {
            return DatabaseError::Conflict(message.into());
        }
    }
    err.into()
}

/// Explicitly constructed data-access handle, injected through
/// `ApiContext` — no ambient global connection.
///
/// A connection is opened per operation and released (dropped) on every
/// exit path of the handler that acquired it; SQLite provides the
/// transaction/row-locking underneath.
#[derive(Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    /// Open (or create) the database at `path`, running migrations once
    /// up front so later per-operation opens find the schema current.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = sqlite::open_database(path)?;
        drop(conn);
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Acquire a connection for one operation.
    pub fn conn(&self) -> Result<Connection, DatabaseError> {
        sqlite::open_database(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("carelog.db");
        let db = Db::open(&path).unwrap();
        assert!(path.exists());
        let conn = db.conn().unwrap();
        let count = sqlite::count_tables(&conn).unwrap();
        assert!(count > 0);
    }

    #[test]
    fn constraint_conflict_maps_unique_violation() {
        let conn = sqlite::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO sites (name) VALUES ('Main')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO users (first_name, last_name, email, password_hash, role, primary_site_id)
             VALUES ('A', 'B', 'a@b.com', 'x', 'nurse', 1)",
            [],
        )
        .unwrap();
        let err = conn
            .execute(
                "INSERT INTO users (first_name, last_name, email, password_hash, role, primary_site_id)
                 VALUES ('C', 'D', 'A@B.COM', 'x', 'nurse', 1)",
                [],
            )
            .unwrap_err();
        let mapped = constraint_conflict(err, "email already in use");
        assert!(matches!(mapped, DatabaseError::Conflict(_)));
    }

    #[test]
    fn constraint_conflict_passes_through_other_errors() {
        let conn = sqlite::open_memory_database().unwrap();
        let err = conn.execute("SELECT * FROM no_such_table", []).unwrap_err();
        let mapped = constraint_conflict(err, "nope");
        assert!(matches!(mapped, DatabaseError::Sqlite(_)));
    }
}
