//! SQLite-backed store for ledger entries, score rows, and milestone rules.
//!
//! One `ScoreDb` wraps one connection. The engine never opens connections
//! implicitly — callers construct a `ScoreDb` (or anything else implementing
//! the store traits) and inject it at engine construction. Background
//! workers each open their own handle against the same file; WAL mode keeps
//! concurrent readers cheap.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

pub mod types;
pub use types::DbError;

pub mod ledger;
pub mod milestones;
pub mod scores;

pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path: PathBuf = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for concurrent read performance during batch sweeps.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        Ok(Self { conn })
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

/// Render a day the way every table stores it.
pub(crate) fn day_to_sql(day: chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a stored day column back into a date.
pub(crate) fn day_from_sql(raw: &str) -> Result<chrono::NaiveDate, DbError> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| DbError::Corrupt(format!("bad day '{}': {}", raw, e)))
}

fn _assert_send<T: Send>() {}
#[allow(dead_code)]
fn _score_db_is_send() {
    // Batch repair moves a handle into spawn_blocking.
    _assert_send::<ScoreDb>();
}

/// Convenience re-export for callers that only need the path-based opener.
pub fn open(path: &Path) -> Result<ScoreDb, DbError> {
    ScoreDb::open_at(path)
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================
