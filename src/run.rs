use crate::cli::{OutputFormat, RunArgs};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use glean_config::{BucketConfig, Config};
use glean_pipeline::{Pipeline, StoredRecord, VerifyReport};
use glean_storage::BucketHandle;
use glean_storage::backend::LocalBucket;
use glean_store::MetadataStore;
use std::io::Write;
use std::sync::Arc;
use tracing::instrument;

pub(crate) fn open_bucket(config: &BucketConfig) -> Result<BucketHandle> {
    match config {
        BucketConfig::Local { root } => {
            let root = std::path::absolute(root).or_raise(|| ErrorKind::Bucket)?;
            let bucket = LocalBucket::new(config.name(), root).or_raise(|| ErrorKind::Bucket)?;
            Ok(Arc::new(bucket))
        },
        #[cfg(feature = "s3")]
        BucketConfig::S3 { bucket, region, endpoint, access_key_id, secret_access_key, root } => {
            Ok(Arc::new(glean_storage::backend::S3Bucket::new(
                bucket.as_str(),
                bucket.as_str(),
                root.clone(),
                region.as_str(),
                endpoint.as_deref(),
                access_key_id.as_str(),
                secret_access_key.as_str(),
            )))
        },
        #[cfg(not(feature = "s3"))]
        BucketConfig::S3 { .. } => exn::bail!(ErrorKind::Unsupported("s3")),
    }
}

pub(crate) fn open_store(config: &Config) -> Result<MetadataStore> {
    let options = config.store.options(config.pipeline.store_concurrency).or_raise(|| ErrorKind::Config)?;
    let store = MetadataStore::new(options);
    Ok(match config.store.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        Some(namespace) => store.with_namespace(namespace),
        None => store,
    })
}

#[instrument(skip_all, fields(bucket = %config.bucket.name()))]
pub async fn run(mut config: Config, args: &RunArgs) -> Result<()> {
    args.apply(&mut config.pipeline);
    let bucket = open_bucket(&config.bucket)?;
    let store = open_store(&config)?;
    let pipeline = Pipeline::new(bucket, store, config.pipeline.options());

    let records = pipeline.run().await.or_raise(|| ErrorKind::Harvest)?;
    let mut stdout = std::io::stdout().lock();
    print_records(&mut stdout, &records, args.output).or_raise(|| ErrorKind::Output)?;

    if config.pipeline.verify {
        let report = glean_pipeline::verify(pipeline.store(), &records).await.or_raise(|| ErrorKind::Verify)?;
        print_report(&mut stdout, &report, args.output).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn print_records(out: &mut impl Write, records: &[StoredRecord], format: OutputFormat) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => {
            for record in records {
                serde_json::to_writer(&mut *out, record)?;
                writeln!(out)?;
            }
        },
        OutputFormat::Text => {
            for record in records {
                match &record.metadata {
                    Some(metadata) => writeln!(out, "{}\t{} fields", record.key, metadata.len())?,
                    None => writeln!(out, "{}\t-", record.key)?,
                }
            }
            let with_metadata = records.iter().filter(|r| r.has_metadata()).count();
            writeln!(out, "{} objects, {} with metadata", records.len(), with_metadata)?;
        },
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &VerifyReport, format: OutputFormat) -> std::io::Result<()> {
    if !report.is_clean() {
        tracing::warn!(
            missing = report.missing.len(),
            mismatched = report.mismatched.len(),
            "Stored metadata differs from the harvest"
        );
    }
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &serde_json::json!({ "verify": report }))?;
            writeln!(out)
        },
        OutputFormat::Text => writeln!(
            out,
            "verified {}: {} missing, {} mismatched",
            report.checked,
            report.missing.len(),
            report.mismatched.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glean_config::{PipelineConfig, StoreConfig, StoreKind};
    use glean_extract::Metadata;
    use std::path::PathBuf;

    fn records() -> Vec<StoredRecord> {
        let metadata: Metadata = [("orientation", 1)].into_iter().collect();
        vec![
            StoredRecord { key: "a.jpg".to_string(), metadata: Some(metadata) },
            StoredRecord { key: "b.jpg".to_string(), metadata: None },
        ]
    }

    fn config(root: PathBuf) -> Config {
        Config {
            bucket: BucketConfig::Local { root },
            store: StoreConfig { kind: StoreKind::Memory, ..StoreConfig::default() },
            pipeline: PipelineConfig::default(),
            log: Default::default(),
        }
    }

    #[test]
    fn test_text_output() {
        let mut out = Vec::new();
        print_records(&mut out, &records(), OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.jpg\t1 fields\nb.jpg\t-\n2 objects, 1 with metadata\n");
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        print_records(&mut out, &records(), OutputFormat::Json).unwrap();
        let lines: Vec<serde_json::Value> =
            String::from_utf8(out).unwrap().lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines[0], serde_json::json!({"key": "a.jpg", "metadata": {"orientation": 1}}));
        assert_eq!(lines[1], serde_json::json!({"key": "b.jpg", "metadata": null}));
    }

    #[test]
    fn test_report_output() {
        let report = VerifyReport { checked: 2, missing: vec!["b.jpg".to_string()], mismatched: Vec::new() };
        let mut out = Vec::new();
        print_report(&mut out, &report, OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "verified 2: 1 missing, 0 mismatched\n");
    }

    #[test]
    fn test_missing_local_root_is_rejected() {
        let err = open_bucket(&BucketConfig::Local { root: PathBuf::from("/definitely/not/here") }).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Bucket));
    }

    #[test]
    fn test_redis_without_url_is_a_config_error() {
        let mut config = config(PathBuf::from("/tmp"));
        config.store.kind = StoreKind::Redis;
        let err = open_store(&config).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Config));
    }

    #[tokio::test]
    async fn test_run_against_a_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), glean_extract::fixtures::camera_jpeg("Canon", "EOS", 1)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let config = config(dir.path().to_path_buf());
        let bucket = open_bucket(&config.bucket).unwrap();
        let store = open_store(&config).unwrap();
        let pipeline = Pipeline::new(bucket, store, config.pipeline.options());
        let records = pipeline.run().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "a.jpg");
        assert!(records[0].has_metadata());
        assert_eq!(records[1].key, "notes.txt");
        assert!(!records[1].has_metadata());

        let report = glean_pipeline::verify(pipeline.store(), &records).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.checked, 2);
    }
}
