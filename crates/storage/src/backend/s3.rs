//! S3-compatible bucket.
//!
//! Works against AWS S3 and S3-compatible services (Backblaze B2, Tigris,
//! MinIO, ...).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file (or the
//! `GLEAN_BUCKET__ACCESS_KEY_ID` / `GLEAN_BUCKET__SECRET_ACCESS_KEY` environment overrides).
//! The AWS credential chain is not consulted.

use crate::{
    Bucket,
    backend::ObjectRefStream,
    error::{ErrorKind, Result},
    models::ObjectRef,
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use exn::ResultExt;
use std::error::Error as StdError;
use std::fmt::Debug;

/// S3-compatible bucket.
///
/// Keys are reported relative to the configured prefix (if any), and are
/// re-prefixed before each request.
///
/// # Examples
///
/// ```no_run
/// use glean_storage::backend::S3Bucket;
///
/// let bucket = S3Bucket::new(
///     "photos",
///     "my-bucket",
///     Some("camera-roll/".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Bucket {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Bucket {
    /// Create a new S3 bucket handle. No network I/O happens until the first
    /// request.
    ///
    /// # Arguments
    /// * `name` - A name for this bucket (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "glean-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // A failed fetch is recorded as absent metadata, a failed listing
            // aborts the run. Neither is retried.
            .retry_config(RetryConfig::disabled())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self::from_client(name, Client::from_conf(config_builder.build()), bucket, prefix)
    }

    /// Wrap an already-configured SDK client.
    pub fn from_client(
        name: impl Into<String>,
        client: Client,
        bucket: impl Into<String>,
        prefix: Option<String>,
    ) -> Self {
        let prefix = prefix.map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty());
        Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Construct the full S3 key from a bucket-relative key.
    fn full_key(prefix: Option<&str>, key: &str) -> String {
        match prefix {
            Some(prefix) => format!("{}/{}", prefix, key.trim_start_matches('/')),
            None => key.to_string(),
        }
    }

    /// Strip the configured prefix from an S3 key.
    fn relative_key<'k>(prefix: Option<&str>, key: &'k str) -> &'k str {
        match prefix {
            Some(prefix) => key.strip_prefix(prefix).and_then(|s| s.strip_prefix('/')).unwrap_or(key),
            None => key,
        }
    }

    /// HTTP range covering the first `bytes` bytes, or `None` for an empty range.
    fn range_header(bytes: usize) -> Option<String> {
        bytes.checked_sub(1).map(|last| format!("bytes=0-{last}"))
    }

    fn error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
    where
        E: ProvideErrorMetadata,
    {
        err.as_service_error().and_then(|e| e.code())
    }

    fn classify<E, R>(err: &SdkError<E, R>, key: &str) -> ErrorKind
    where
        E: ProvideErrorMetadata + StdError + 'static,
        R: Debug,
    {
        match Self::error_code(err) {
            Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => ErrorKind::NotFound(key.to_string()),
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
                ErrorKind::PermissionDenied(key.to_string())
            },
            _ => match err {
                SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
                    ErrorKind::Network(DisplayErrorContext(err).to_string())
                },
                _ => ErrorKind::BackendError(DisplayErrorContext(err).to_string()),
            },
        }
    }
}

#[async_trait]
impl Bucket for S3Bucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> ObjectRefStream<'a> {
        Box::pin(stream! {
            let request_prefix = match (self.prefix.as_deref(), prefix) {
                (Some(base), Some(prefix)) => Some(Self::full_key(Some(base), prefix)),
                (Some(base), None) => Some(format!("{base}/")),
                (None, prefix) => prefix.map(str::to_string),
            };
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(request_prefix)
                .send()
                .await;
            let output = match response {
                Ok(output) => output,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::classify(&err, &self.bucket)));
                    return;
                },
            };
            if output.is_truncated().unwrap_or(false) {
                tracing::warn!(
                    bucket = %self.bucket,
                    returned = output.contents().len(),
                    "Listing was truncated; only the first page will be harvested"
                );
            }
            for object in output.contents() {
                match object.key() {
                    Some(key) if key.ends_with('/') => tracing::debug!(key, "Skipping directory placeholder"),
                    Some(key) => yield Ok(ObjectRef::new(Self::relative_key(self.prefix.as_deref(), key))),
                    None => tracing::warn!(bucket = %self.bucket, "Skipping listing entry without a key"),
                }
            }
        })
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        let Some(range) = Self::range_header(bytes) else {
            return Ok(Vec::new());
        };
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(Self::full_key(self.prefix.as_deref(), key))
            .range(range)
            .send()
            .await;
        let output = match response {
            Ok(output) => output,
            // A range request against a zero-length object is unsatisfiable.
            Err(err) if Self::error_code(&err) == Some("InvalidRange") => return Ok(Vec::new()),
            Err(err) => exn::bail!(Self::classify(&err, key)),
        };
        let body = output.body.collect().await.or_raise(|| ErrorKind::Network(format!("reading body of {key}")))?;
        let mut data = body.into_bytes().to_vec();
        // Some S3-compatible services ignore the Range header and send everything.
        data.truncate(bytes);
        Ok(data)
    }
}
