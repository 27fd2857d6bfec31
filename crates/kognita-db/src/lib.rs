//! # kognita-db
//!
//! libSQL persistence for the Kognita practice/testing platform: the session
//! lifecycle state machine, the task-assignment policies (weighted
//! spaced-repetition lottery for practice, eager shuffled batch for exams,
//! incremental random picks for lecture-note recaps), the task-result store,
//! and the submission pipeline tying them together.
//!
//! Uses the `libsql` crate (C `SQLite` fork) — embedded local databases for
//! tests, file-backed in production, one schema either way.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;

mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle for all Kognita state operations.
///
/// Wraps a libSQL database and connection. Repository methods live on
/// [`service::KognitaService`], which wraps this handle together with the
/// session configuration and the assignment RNG.
pub struct KognitaDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl KognitaDb {
    /// Open a local-only database at the given path (`":memory:"` for
    /// tests).
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let kognita_db = Self { db, conn };
        kognita_db.run_migrations().await?;
        Ok(kognita_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// The rowid of the most recent successful INSERT on this connection.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}
