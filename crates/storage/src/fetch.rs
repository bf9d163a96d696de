//! Bounded-prefix object fetching.

use crate::BucketHandle;
use crate::error::Result;
use crate::models::FetchResult;
use tracing::instrument;

/// Default head size: enough for the EXIF block of a typical camera JPEG
/// without its embedded thumbnail.
pub const DEFAULT_HEAD_BYTES: usize = 8 * 1024;

/// Fetches the leading bytes of objects from a bucket.
///
/// Only `head_bytes` are ever requested, whatever the object's size: embedded
/// metadata lives at the start of the file, and a bounded read keeps latency
/// and bandwidth per object constant.
#[derive(Clone)]
pub struct ObjectFetcher {
    bucket: BucketHandle,
    head_bytes: usize,
}
impl ObjectFetcher {
    pub fn new(bucket: BucketHandle, head_bytes: usize) -> Self {
        Self { bucket, head_bytes }
    }

    pub fn head_bytes(&self) -> usize {
        self.head_bytes
    }

    /// Fetch the prefix of the object at `key`.
    ///
    /// Errors from the bucket are returned untouched; deciding what a failed
    /// fetch means is the caller's job.
    #[instrument(level = "debug", skip(self), fields(bucket = self.bucket.name(), head_bytes = self.head_bytes))]
    pub async fn fetch(&self, key: &str) -> Result<FetchResult> {
        if self.head_bytes == 0 {
            return Ok(FetchResult { key: key.to_string(), bytes: Vec::new() });
        }
        let bytes = self.bucket.read_head(key, self.head_bytes).await?;
        tracing::trace!(fetched = bytes.len(), "Fetched object head");
        Ok(FetchResult { key: key.to_string(), bytes })
    }
}
