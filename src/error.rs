//! Error types for taskdb.

/// Result type alias for taskdb operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// No status row carries this name.
    #[error("status '{0}' not found")]
    StatusNotFound(String),

    #[error("status #{0} not found")]
    StatusIdNotFound(i64),

    #[error("user #{0} not found")]
    UserNotFound(i64),

    /// A string that is not part of the status vocabulary.
    #[error("invalid status '{0}': must be new, in progress, or completed")]
    InvalidStatus(String),

    #[error("{0}")]
    Invalid(String),

    /// Tasks were requested but there are no users to own them.
    #[error("no users to assign tasks to")]
    NothingToAssign,
}
