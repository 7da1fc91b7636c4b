//! Prefix-len command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::output::{print_single, OutputFormat};

use super::{load_engine, CommandContext};

/// Prefix-len command - print the required first-packet length.
#[derive(Debug, Args)]
pub struct PrefixLenCommand {
    /// Rule file whose `[sniff]` section sets the window.
    #[arg(long, env = "RELAY_HOOK_RULES")]
    rules: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PrefixLen {
    required_prefix_length: u32,
}

impl PrefixLenCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let engine = load_engine(self.rules.as_deref())?;
        let len = engine.required_prefix_length();

        match ctx.format {
            OutputFormat::Json => print_single(&PrefixLen {
                required_prefix_length: len,
            }),
            OutputFormat::Table => println!("{len}"),
        }

        Ok(())
    }
}
