//! Pipeline Error Types
//!
//! Only run-level failures live here. A single object that cannot be fetched
//! or decoded is not an error: it is recorded with absent metadata.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing the bucket failed; nothing was fetched or stored.
    #[display("could not enumerate bucket")]
    Enumerate,
    /// Persisting the metadata of an object failed; the run was aborted.
    #[display("could not store metadata for {_0}")]
    Store(#[error(not(source))] String),
    /// Reading back a stored key during verification failed.
    #[display("could not read back {_0} for verification")]
    Verify(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// The pipeline never retries by itself; this is for callers deciding
    /// whether to run again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Enumerate | Self::Store(_))
    }
}
