use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use glean_config::PipelineConfig;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "glean", version, about = "Harvest embedded image metadata from object storage into a key-value store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML, YAML or JSON); defaults to the user config directory
    #[arg(short, long, global = true, env = "GLEAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enumerate the bucket, extract metadata from every object and store it
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Only harvest keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Maximum concurrent fetch-and-extract operations
    #[arg(long)]
    pub fetch_concurrency: Option<NonZeroUsize>,

    /// Maximum concurrent store writes
    #[arg(long)]
    pub store_concurrency: Option<NonZeroUsize>,

    /// Leading bytes to fetch from each object
    #[arg(long)]
    pub head_bytes: Option<usize>,

    /// Read every stored key back after the run and compare
    #[arg(long)]
    pub verify: bool,

    /// How to print the harvested records
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per object, then a summary
    Text,
    /// One JSON object per line
    Json,
}

impl RunArgs {
    /// Flags take precedence over the file and the environment.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(prefix) = &self.prefix {
            config.prefix = Some(prefix.clone());
        }
        if let Some(limit) = self.fetch_concurrency {
            config.fetch_concurrency = limit;
        }
        if let Some(limit) = self.store_concurrency {
            config.store_concurrency = limit;
        }
        if let Some(bytes) = self.head_bytes {
            config.head_bytes = bytes;
        }
        config.verify |= self.verify;
    }
}
