mod cli;
mod commands;
mod console;
mod error;
mod telemetry;
mod watch;

use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let log_config = cli.logging.to_config();
    telemetry::init(&log_config).map_err(|err| CliError::Logging(err.to_string()))?;
    debug!(log_level = ?log_config.level, log_file = ?log_config.file, "logging configured");

    let config = cli.client_config()?;
    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch::run(config).await,
        Command::Status => commands::status(&config).await,
        Command::Screen(args) => commands::screen(&config, args.power.into()).await,
        Command::Delete(args) => commands::delete(&config, &args.path).await,
    }
}
