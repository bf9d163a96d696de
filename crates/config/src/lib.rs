//! Configuration loading and validation.
//!
//! Settings are merged from, in increasing priority:
//! 1. built-in defaults,
//! 2. a config file (TOML, YAML or JSON, chosen by extension), and
//! 3. `GLEAN_`-prefixed environment variables, with `__` separating nested
//!    keys (`GLEAN_PIPELINE__FETCH_CONCURRENCY=8`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;
mod models;

pub use crate::models::{BucketConfig, Config, LogConfig, LogFormat, PipelineConfig, StoreConfig, StoreKind};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "GLEAN_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "glean")
}

/// `config.toml` in the user's configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `glean.db` in the user's data directory.
pub fn default_database_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("glean.db"))
}

impl Config {
    /// Load from `path` (which must exist) or, if `None`, from the default
    /// config file when there is one; then apply the environment.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => with_file(Figment::new(), path)?,
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => with_file(Figment::new(), &path)?,
                None => Figment::new(),
            },
        };
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(bucket = %config.bucket.name(), store = ?config.store.kind, "Configuration loaded");
        Ok(config)
    }
}

fn with_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::io::Write;
    use std::num::NonZeroUsize;
    use tempfile::NamedTempFile;

    fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const TOML: &str = r#"
        [bucket]
        kind = "s3"
        bucket = "photos"
        access_key_id = "AKIA"
        secret_access_key = "secret"

        [pipeline]
        fetch_concurrency = 8
    "#;

    const YAML: &str = "
bucket:
  kind: s3
  bucket: photos
  access_key_id: AKIA
  secret_access_key: secret
pipeline:
  fetch_concurrency: 8
";

    const JSON: &str = r#"{
        "bucket": {"kind": "s3", "bucket": "photos", "access_key_id": "AKIA", "secret_access_key": "secret"},
        "pipeline": {"fetch_concurrency": 8}
    }"#;

    #[rstest]
    #[case(".toml", TOML)]
    #[case(".yaml", YAML)]
    #[case(".yml", YAML)]
    #[case(".json", JSON)]
    fn test_file_formats(#[case] suffix: &str, #[case] contents: &str) {
        let file = config_file(suffix, contents);
        let config = Config::from_figment(with_file(Figment::new(), file.path()).unwrap()).unwrap();
        assert_eq!(config.bucket.name(), "photos");
        assert!(matches!(&config.bucket, BucketConfig::S3 { region, .. } if region == "us-east-1"));
        assert_eq!(config.pipeline.fetch_concurrency.get(), 8);
        assert_eq!(config.pipeline.store_concurrency.get(), 10);
    }

    #[test]
    fn test_defaults() {
        let file = config_file(".toml", "[bucket]\nkind = \"local\"\nroot = \"/srv/photos\"\n");
        let config = Config::from_figment(with_file(Figment::new(), file.path()).unwrap()).unwrap();
        assert_eq!(config.bucket, BucketConfig::Local { root: PathBuf::from("/srv/photos") });
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.pipeline.fetch_concurrency.get(), 4);
        assert_eq!(config.pipeline.head_bytes, 8192);
        assert!(!config.pipeline.verify);
        assert_eq!(config.store.kind, StoreKind::Sqlite);
        assert_eq!(config.log.level, "info");
    }

    #[rstest]
    #[case("fetch_concurrency")]
    #[case("store_concurrency")]
    fn test_zero_concurrency_is_rejected(#[case] field: &str) {
        let contents = format!("[bucket]\nkind = \"local\"\nroot = \"/srv\"\n[pipeline]\n{field} = 0\n");
        let file = config_file(".toml", &contents);
        let err = Config::from_figment(with_file(Figment::new(), file.path()).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
    }

    #[test]
    fn test_missing_bucket_is_rejected() {
        let err = Config::from_figment(Figment::new()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = config_file(".ini", "bucket = photos");
        let err = with_file(Figment::new(), file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("glean.toml", TOML)?;
            jail.set_env("GLEAN_PIPELINE__STORE_CONCURRENCY", "3");
            jail.set_env("GLEAN_STORE__KIND", "redis");
            jail.set_env("GLEAN_STORE__URL", "redis://cache:6379");
            let config = Config::load(Some(Path::new("glean.toml"))).unwrap();
            assert_eq!(config.pipeline.fetch_concurrency.get(), 8);
            assert_eq!(config.pipeline.store_concurrency.get(), 3);
            assert_eq!(config.store.kind, StoreKind::Redis);
            assert_eq!(config.store.url.as_deref(), Some("redis://cache:6379"));
            Ok(())
        });
    }

    #[test]
    fn test_store_options() {
        let ten = NonZeroUsize::new(10).unwrap();
        let sqlite = StoreConfig { path: Some(PathBuf::from("/tmp/glean.db")), ..StoreConfig::default() };
        assert_eq!(
            sqlite.options(ten).unwrap(),
            glean_store::StoreOptions::Sqlite { path: PathBuf::from("/tmp/glean.db"), max_connections: 10 }
        );
        let memory = StoreConfig { kind: StoreKind::Memory, ..StoreConfig::default() };
        assert_eq!(memory.options(ten).unwrap(), glean_store::StoreOptions::SqliteInMemory);
        let redis = StoreConfig { kind: StoreKind::Redis, ..StoreConfig::default() };
        let err = redis.options(ten).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Missing("store.url")));
    }

    #[test]
    fn test_pipeline_options() {
        let config = PipelineConfig { prefix: Some("2024/".to_string()), head_bytes: 4096, ..PipelineConfig::default() };
        let options = config.options();
        assert_eq!(options.prefix.as_deref(), Some("2024/"));
        assert_eq!(options.head_bytes, 4096);
        assert_eq!(options.fetch_concurrency.get(), 4);
    }
}
