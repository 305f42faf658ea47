//! Error types for NotePad core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-facing messages and exit codes.

use thiserror::Error;

/// Result type alias for NotePad operations.
pub type Result<T> = std::result::Result<T, NotePadError>;

/// Core error type for NotePad operations.
#[derive(Debug, Error)]
pub enum NotePadError {
    /// Empty names, bad privacy levels, content/level mismatches
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Update or lookup target does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Explicit id or unique name already taken
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The backing store could not begin or commit a unit of work
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    /// Unknown field in a sort specification
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),

    /// Unknown direction token in a sort specification
    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),

    /// Password verification failed
    #[error("Incorrect password")]
    InvalidPassword,

    /// An encryption operation needs a key but the session is locked
    #[error("No encryption key is held; unlock with the password first")]
    Locked,

    /// Key derivation, cipher or password-record failure
    #[error("Security error: {0}")]
    Security(String),

    /// The repository has no open session
    #[error("Repository is not open")]
    Closed,

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl NotePadError {
    /// True for errors raised by the security layer.
    ///
    /// `InvalidPassword` is the distinguished verification failure; the other
    /// security errors cover generic key-derivation and cipher faults.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            NotePadError::InvalidPassword | NotePadError::Locked | NotePadError::Security(_)
        )
    }

    /// True for faults of the backing store itself, as opposed to rejected
    /// input or a missing target.
    ///
    /// Repository operations raise every other error before writing.
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            NotePadError::Storage(_)
                | NotePadError::Sqlite { .. }
                | NotePadError::Io { .. }
                | NotePadError::TransactionFailure(_)
        )
    }

    /// Map SQLite UNIQUE/PRIMARY KEY violations to `DuplicateKey`.
    pub(crate) fn from_constraint(err: rusqlite::Error, what: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                NotePadError::DuplicateKey(what.to_string())
            }
            other => NotePadError::Sqlite { source: other },
        }
    }
}
