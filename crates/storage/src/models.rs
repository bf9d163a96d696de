//! Storage models.
//!
//! These types are the only things that leave the storage crate: the
//! identifiers produced by enumeration and the byte prefixes produced by
//! fetching.

/// An object in a bucket, identified by its key.
///
/// Produced solely by [`Bucket::list`](crate::Bucket::list); never modified
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object key, relative to the bucket (and any configured prefix).
    pub key: String,
}
impl ObjectRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}
impl From<&str> for ObjectRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// The leading bytes of an object.
///
/// `bytes` is never longer than the head size the
/// [`ObjectFetcher`](crate::ObjectFetcher) was constructed with, and may be
/// shorter (or empty) when the object itself is smaller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub key: String,
    pub bytes: Vec<u8>,
}
