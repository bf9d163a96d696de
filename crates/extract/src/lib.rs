pub mod error;
mod extractor;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod format;
pub mod models;

pub use crate::extractor::Extractor;
pub use crate::format::Format;
pub use crate::models::Metadata;
use tracing::instrument;

/// Easy, top-level entrypoint for decoding embedded metadata from the leading
/// bytes of an image.
///
/// Every failure (empty buffer, unknown container, missing, truncated, or
/// malformed EXIF block) means the same thing to a caller walking a bucket:
/// this object has no usable metadata. The reason is logged at debug level and
/// `None` is returned; see [`Extractor::metadata`] for the structured error.
#[instrument(level = "debug", skip(bytes), fields(len = bytes.as_ref().len()))]
pub fn extract(bytes: impl AsRef<[u8]>) -> Option<Metadata> {
    match Extractor::new(bytes.as_ref()).metadata() {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            let reason: &error::ErrorKind = &err;
            tracing::debug!(%reason, "No usable metadata");
            None
        },
    }
}
