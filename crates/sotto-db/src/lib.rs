//! Sotto Database - SQLite persistence for daemon settings.
//!
//! This crate owns the SQLite connection, schema migrations, and the
//! [`ConfigStore`] read/write-through cache the controller works against.

pub mod error;
pub mod migrations;
pub mod schema;
pub mod store;

pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use store::ConfigStore;

use std::path::PathBuf;

use directories::ProjectDirs;
use rusqlite::Connection;
use tracing::{debug, info};

/// Database handle for Sotto.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open() -> DbResult<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open or create the database at a specific path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open_at(path: PathBuf) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(?path, "Opening database");
        let conn = Connection::open(&path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        let mut db = Self { conn };
        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> DbResult<Self> {
        debug!("Opening in-memory database");
        let conn = Connection::open_in_memory()?;

        let mut db = Self { conn };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the default database path.
    fn default_path() -> DbResult<PathBuf> {
        let dirs = ProjectDirs::from("io", "sotto", "Sotto").ok_or(DbError::NoDataDir)?;
        Ok(dirs.data_dir().join("sotto.db"))
    }

    /// Run database migrations.
    fn run_migrations(&mut self) -> DbResult<()> {
        migrations::run(&mut self.conn)
    }

    /// Read one setting value by row key.
    ///
    /// # Errors
    /// Returns `MissingField` if the row is absent, which means the database
    /// was not seeded by the migrations.
    pub fn read_setting(&self, key: &str) -> DbResult<String> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| row.get(0))
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::MissingField(key.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// Write one setting value by row key.
    ///
    /// # Errors
    /// Returns `MissingField` if the row is absent; settings rows are seeded
    /// once by the migrations and only ever updated.
    pub fn write_setting(&self, key: &str, value: &str) -> DbResult<()> {
        let changed = self.conn.execute(
            "UPDATE settings SET value = ?, updated_at = datetime('now') WHERE key = ?",
            [value, key],
        )?;
        if changed == 0 {
            return Err(DbError::MissingField(key.to_string()));
        }
        Ok(())
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        assert!(db.conn().is_autocommit());
    }

    #[test]
    fn test_open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sotto.db");

        let db = Database::open_at(path.clone()).expect("Failed to open database");
        drop(db);

        assert!(path.exists());

        // Reopening runs migrations again without error.
        Database::open_at(path).expect("Failed to reopen database");
    }

    #[test]
    fn test_setting_round_trip() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.read_setting("level").unwrap(), "50");
        db.write_setting("level", "64").unwrap();
        assert_eq!(db.read_setting("level").unwrap(), "64");
    }

    #[test]
    fn test_unknown_key_fails_fast() {
        let db = Database::open_in_memory().unwrap();

        assert_matches!(db.read_setting("no_such_key"), Err(DbError::MissingField(_)));
        assert_matches!(db.write_setting("no_such_key", "1"), Err(DbError::MissingField(_)));
    }
}
