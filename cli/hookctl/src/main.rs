//! hookctl - CLI for relay-hook
//!
//! Validates rule files and dry-runs routing decisions against captured
//! first packets, using the same engine the relay loads.

use anyhow::Result;
use clap::Parser;

mod commands;
mod error;
mod input;
mod output;

use commands::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    // Run the command
    if let Err(e) = cli.run() {
        // Print error in a user-friendly way
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
