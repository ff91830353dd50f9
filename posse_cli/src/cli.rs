use clap::Parser;
use log::Level;

use crate::commands::consistency::CheckConsistency;
use crate::commands::migrate::MigrateLegacy;

/// posse operator CLI
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    #[arg(long, default_value_t = Level::Info)]
    pub log_level: Level,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Parser)]
pub enum SubCommand {
    /// Backfill legacy per-post JSON files into the SQLite store
    MigrateLegacy(MigrateLegacy),
    /// Validate syndication mapping records for internal consistency
    CheckConsistency(CheckConsistency),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert()
    }
}
