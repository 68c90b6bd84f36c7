//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. It is constructed
//! explicitly and handed to whoever needs it; there is no process-wide
//! connection.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/vidcast/vidcast.db`
    /// - macOS:   `~/Library/Application Support/io.vidcast.vidcast/vidcast.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\vidcast\vidcast\data\vidcast.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("io", "vidcast", "vidcast").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Self::open_at(&data_dir.join("vidcast.db"))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Private in-memory database; gone when dropped. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Close the connection, flushing the WAL.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    /// Run `f` inside one SQLite transaction.
    ///
    /// Everything `f` writes through [`Database::conn`] commits together or
    /// not at all. Must not be nested.
    pub(crate) fn atomically<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Sqlite(e).in_transaction(operation))?;

        let value = f().map_err(|e| {
            tracing::debug!(operation, error = %e, "rolling back");
            e.in_transaction(operation)
        })?;

        tx.commit()
            .map_err(|e| StoreError::Sqlite(e).in_transaction(operation))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
        db.close().unwrap();

        // Reopening an existing file must not re-run the initial migration.
        Database::open_at(&path).expect("should reopen");
    }

    #[test]
    fn in_memory_has_no_path() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
    }

    #[test]
    fn failed_closure_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.atomically("insert then fail", || {
            db.conn().execute(
                "INSERT INTO tags (id, name, created_at, updated_at) VALUES ('t', 'x', '', '')",
                [],
            )?;
            Err(StoreError::Forbidden("nope".into()))
        });

        assert!(matches!(result, Err(StoreError::Forbidden(_))));
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn storage_errors_become_transaction_failed() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.atomically("bad sql", || {
            db.conn().execute("INSERT INTO no_such_table VALUES (1)", [])?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(StoreError::TransactionFailed { operation: "bad sql", .. })
        ));
    }
}
