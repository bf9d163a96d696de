use glean_extract::Metadata;
use serde::Serialize;

/// An object after fetch and extraction.
///
/// `metadata` is `None` when the object could not be fetched, carried no
/// decodable header, or the header could not be parsed. That is a result,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItem {
    pub key: String,
    pub metadata: Option<Metadata>,
}

/// An object whose metadata (possibly absent) has been written to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub key: String,
    pub metadata: Option<Metadata>,
}

impl From<ExtractedItem> for StoredRecord {
    fn from(item: ExtractedItem) -> Self {
        Self { key: item.key, metadata: item.metadata }
    }
}

impl StoredRecord {
    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }
}
