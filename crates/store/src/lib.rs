//! Key-value persistence for harvested metadata.
//!
//! # Architecture
//! - [`KeyValueStore`]: the text-in, text-out backend capability. SQLite is
//!   always available; Redis behind the `redis` feature; an in-memory store
//!   behind `mock`.
//! - [`Connector`]: opens a backend. Implemented for [`StoreOptions`] and for
//!   an already-open [`KvHandle`].
//! - [`MetadataStore`]: the serializing facade the pipeline writes through,
//!   connecting lazily on first use.

mod connector;
pub mod error;
pub mod kv;
mod store;

pub use crate::connector::{Connector, StoreOptions};
pub use crate::kv::{KeyValueStore, KvHandle, SqliteStore};
pub use crate::store::MetadataStore;
