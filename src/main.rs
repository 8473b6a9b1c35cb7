//! taskmend CLI entry point.

use clap::Parser;

use taskmend::cli::commands::{self, load_config};
use taskmend::cli::{handle_error, Cli, Commands};
use taskmend::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };
    let logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::execute(args, cli.json).await,
        Commands::Run(args) => commands::run::execute(args, &config, cli.json).await,
        Commands::Gate(args) => commands::gate::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        // Flush buffered file logs before exiting.
        drop(logger);
        handle_error(err, cli.json);
    }
}
