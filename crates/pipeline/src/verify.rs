//! Read-back verification of a finished run.

use crate::error::{ErrorKind, Result};
use crate::models::StoredRecord;
use exn::ResultExt;
use glean_extract::Metadata;
use glean_store::MetadataStore;
use serde::Serialize;
use tracing::instrument;

/// Outcome of [`verify`]. Missing and mismatched keys are data, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

/// Re-read every record from `store`, one at a time, and compare it with what
/// the run returned.
///
/// # Errors
///
/// [`ErrorKind::Verify`] if a key cannot be read back at all.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn verify(store: &MetadataStore, records: &[StoredRecord]) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    for record in records {
        let stored: Option<Option<Metadata>> =
            store.get(&record.key).await.or_raise(|| ErrorKind::Verify(record.key.clone()))?;
        report.checked += 1;
        match stored {
            None => {
                tracing::warn!(key = %record.key, "Stored key is missing");
                report.missing.push(record.key.clone());
            },
            Some(metadata) if metadata != record.metadata => {
                tracing::warn!(key = %record.key, "Stored metadata differs from harvested metadata");
                report.mismatched.push(record.key.clone());
            },
            Some(_) => {},
        }
    }
    tracing::info!(checked = report.checked, missing = report.missing.len(), mismatched = report.mismatched.len(), "Verification complete");
    Ok(report)
}
