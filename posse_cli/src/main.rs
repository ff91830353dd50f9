use anyhow::Error;
use clap::Parser;

use posse_adapters::configure_logger;
use posse_config::load_config;

mod cli;
mod commands;

use cli::{Cli, SubCommand};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Cli = Cli::parse();
    configure_logger(opts.log_level);

    let config = load_config()?;
    log::info!("storage root {}", config.storage_dir.display());

    match opts.subcmd {
        SubCommand::MigrateLegacy(cmd) => cmd.execute(&config).await,
        SubCommand::CheckConsistency(cmd) => cmd.execute(&config).await,
    }
}
