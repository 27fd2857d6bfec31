//! Database error types for kognita-db.
//!
//! The variants mirror the failure taxonomy the transport layer maps to
//! status codes: `Unauthorized`/`Forbidden` for identity failures,
//! `BadRequest` for malformed input, `NotFound` for dangling references,
//! `InvalidState` for invariant violations that should never happen in a
//! correctly functioning system. Running out of assignable tasks is NOT an
//! error — see `kognita_core::enums::AssignmentOutcome`.

use thiserror::Error;

/// Errors from database and session-engine operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No authenticated user where one is required.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but not the owner of the resource.
    #[error("Forbidden")]
    Forbidden,

    /// Malformed or empty input (zero-task exam, non-positive goal,
    /// submission to a completed or nonexistent slot).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A referenced entity does not exist.
    #[error("Entity not found: {entity} {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invariant violation (e.g., active session with no assigned task).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Convenience constructor for a missing entity.
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}
