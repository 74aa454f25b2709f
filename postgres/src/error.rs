//! Error types for the Postgres-backed persistence layer.

use thiserror::Error;

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Errors raised by the event ledger, audit log, outbox, advisory lock, and
/// repository modules.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row expected to exist (by primary key, under `FOR UPDATE`) was not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The row changed between the read and the write of a three-phase operation.
    #[error("concurrency lost re-reading {0}")]
    ConcurrencyLost(String),

    /// A value stored in a JSON/enum column could not be decoded into its Rust type.
    #[error("failed to decode column {column}: {reason}")]
    Decode {
        /// Column name.
        column: &'static str,
        /// Decode failure reason.
        reason: String,
    },
}

impl PersistenceError {
    /// Returns `true` if retrying the whole three-phase operation might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyLost(_))
    }
}
