//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every one of these is an expected outcome for some
//! objects in a bucket; [`extract`](crate::extract) turns them all into
//! "no metadata".

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why no metadata could be extracted.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing was fetched (zero-length object or empty range).
    #[display("empty buffer")]
    Empty,
    /// The magic bytes don't match any container that can carry EXIF.
    #[display("unsupported format")]
    UnsupportedFormat,
    /// The container was recognised but has no EXIF block, or the block has
    /// no recognised fields.
    #[display("no embedded metadata in {_0}")]
    NoMetadata(#[error(not(source))] &'static str),
    /// The metadata block extends past the end of the fetched prefix.
    #[display("metadata header truncated")]
    Truncated,
    /// The metadata block is present but cannot be decoded.
    #[display("malformed metadata header: {_0}")]
    Malformed(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only a truncated header could decode with a larger prefix; the bytes
    /// themselves never change between attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NoMetadata("JPEG").to_string(), "no embedded metadata in JPEG");
        assert_eq!(ErrorKind::Malformed("bad IFD".to_string()).to_string(), "malformed metadata header: bad IFD");
    }

    #[test]
    fn only_truncation_is_retryable() {
        assert!(ErrorKind::Truncated.is_retryable());
        assert!(!ErrorKind::Empty.is_retryable());
        assert!(!ErrorKind::UnsupportedFormat.is_retryable());
    }
}
