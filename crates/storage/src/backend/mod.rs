//! Bucket trait and implementations.
//!
//! This module defines the [`Bucket`] trait, the two capabilities the harvest
//! pipeline consumes from object storage: enumerate keys, and read the first
//! few bytes of an object.

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBucket;
#[cfg(feature = "mock")]
pub use self::mock::MockBucket;
#[cfg(feature = "s3")]
pub use self::s3::S3Bucket;
use crate::error::Result;
use crate::models::ObjectRef;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub type ObjectRefStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectRef>> + Send + 'a>>;

/// Read-only view of an object-storage bucket.
///
/// All operations are asynchronous; implementations must be safe to call
/// concurrently from many in-flight futures (the pipeline shares one handle
/// across every fetch).
///
/// # Examples
///
/// ```
/// use glean_storage::{Bucket, error::Result};
///
/// async fn first_bytes_of_everything(bucket: &dyn Bucket) -> Result<Vec<(String, Vec<u8>)>> {
///     let mut heads = Vec::new();
///     for object in bucket.list(None).await? {
///         let head = bucket.read_head(&object.key, 16).await?;
///         heads.push((object.key, head));
///     }
///     Ok(heads)
/// }
/// ```
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Name of the configured bucket (used for logging only).
    fn name(&self) -> &str;

    /// List every object key matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectRef>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream object keys matching an optional prefix.
    ///
    /// # Notes
    /// - Remote buckets perform exactly one listing request; results beyond
    ///   the first page are not fetched.
    /// - Listing a prefix that matches nothing yields an empty stream, not an
    ///   error.
    /// - Entries that cannot be turned into an [`ObjectRef`] (no key, a
    ///   "directory" placeholder) are skipped with a warning.
    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> ObjectRefStream<'a>;

    /// Read only the first `bytes` bytes of an object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist. If the object is smaller than `bytes`, the entire
    /// object is returned; an empty object yields an empty buffer.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use glean_storage::{Bucket, error::Result};
    /// # async fn example(bucket: &dyn Bucket) -> Result<()> {
    /// let magic = bucket.read_head("holiday/IMG_0001.jpg", 3).await?;
    /// let is_jpeg = magic == [0xFF, 0xD8, 0xFF];
    /// # Ok(())
    /// # }
    /// ```
    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>>;
}
