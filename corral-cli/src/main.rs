//! Corral CLI - Run task batches on bounded pools.

use clap::Parser;

use corral_cli::cli::{Cli, Command};
use corral_cli::commands;
use corral_cli::config::Config;
use corral_cli::error::CliResult;
use corral_cli::output;
use corral_core::logging;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    if cli.verbose {
        logging::init_with_level("debug");
    } else {
        logging::init();
    }

    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Command::Count(args) => commands::count::run(args, &config).await,
        Command::Db(args) => commands::db::run(args, &config).await,
        Command::Bench(args) => commands::bench::run(args, &config).await,
        Command::Version => commands::version::run().await,
    }
}
