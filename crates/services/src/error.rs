//! Shared error types for the services crate.

use thiserror::Error;

use portal_core::model::{EnrollmentError, GradeError, QuestionError, SessionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Malformed request input, rejected before any store access.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("invalid enrollment number: {0}")]
    Enrollment(#[from] EnrollmentError),
    #[error("invalid question request: {0}")]
    Question(#[from] QuestionError),
    #[error("invalid grade: {0}")]
    Grade(#[from] GradeError),
    #[error("{field} {value} is out of range")]
    IdOutOfRange { field: &'static str, value: u64 },
}

/// Errors emitted by the practice session lifecycle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No `Active` session with this id: never opened, or already closed.
    #[error("no active practice session with id {session_id}")]
    NotFound { session_id: SessionId },
    #[error("transaction failed: {0}")]
    Transaction(#[from] StorageError),
    #[error("start offset {offset} puts the session start out of range")]
    StartTimeOverflow { offset: chrono::Duration },
    /// A stored question could not be read back as its shape.
    #[error("malformed stored question: {0}")]
    Question(#[from] QuestionError),
}

/// Errors emitted by `HierarchyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HierarchyError {
    #[error("no {what} found")]
    Empty { what: &'static str },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
