//! Metadata harvesting pipeline.
//!
//! Connects three stages: enumerate a bucket, fetch the leading bytes of each
//! object and extract its embedded metadata, then persist the result. Each
//! stage after enumeration has its own concurrency bound; see [`Pipeline`].

pub mod error;
mod models;
mod options;
mod pipeline;
mod verify;

pub use crate::models::{ExtractedItem, StoredRecord};
pub use crate::options::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_STORE_CONCURRENCY, PipelineOptions};
pub use crate::pipeline::{HarvestEvent, Pipeline};
pub use crate::verify::{VerifyReport, verify};
