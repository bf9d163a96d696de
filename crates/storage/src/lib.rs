pub mod backend;
pub mod error;
mod fetch;
mod models;
mod path;

pub use crate::backend::{Bucket, ObjectRefStream};
pub use crate::fetch::{DEFAULT_HEAD_BYTES, ObjectFetcher};
pub use crate::models::{FetchResult, ObjectRef};
pub use crate::path::validate as validate_key;
use std::sync::Arc;

pub type BucketHandle = Arc<dyn Bucket + Send + Sync>;
