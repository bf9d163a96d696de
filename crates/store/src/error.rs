//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Backend errors (`sqlx`, `redis`) are kept as the source
//! frame underneath one of these kinds.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The backing store could not be reached or opened.
    #[display("could not connect to {_0} store")]
    Connect(#[error(not(source))] String),
    /// The store was selected but this binary was built without its backend.
    #[display("{_0} store support is not compiled in")]
    Unsupported(#[error(not(source))] &'static str),
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("redis command failed")]
    Redis,
    /// A write was rejected by the backend.
    #[display("write rejected for key {_0}")]
    Rejected(#[error(not(source))] String),
    #[display("could not serialize value for key {_0}")]
    Serialize(#[error(not(source))] String),
    /// The stored text could not be decoded into the requested type.
    #[display("invalid stored value for key {_0}")]
    InvalidData(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Redis)
    }
}
