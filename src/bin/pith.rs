//! Pith CLI Binary
//!
//! Command-line entry point: parse arguments, initialize logging, route to
//! the CLI layer, and exit with the code it reports.

use clap::Parser;
use pith::cli::{self, Cli};
use pith::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::debug;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging_config = LoggingConfig::from_flags(cli.verbose);
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    debug!("pith starting");
    let code = cli::execute(&cli).await;
    process::exit(code);
}
