mod cli;
mod error;
mod logging;
mod run;

use crate::cli::{Cli, Command};
use crate::error::ErrorKind;
use clap::Parser;
use exn::ResultExt;
use glean_config::{Config, LogConfig};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config);
    let log = config.as_ref().map(|config| config.log.clone()).unwrap_or_else(|_| LogConfig::default());
    logging::init(&log, cli.verbose);

    let result = match config {
        Ok(config) => match &cli.command {
            Command::Run(args) => run::run(config, args).await,
        },
        Err(err) => Err(err),
    };

    result.map_err(|err| {
        tracing::error!("{err:?}");
        miette::miette!("{err}")
    })
}
