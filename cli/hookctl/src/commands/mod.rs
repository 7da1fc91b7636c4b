//! CLI commands.

mod check;
mod decide;
mod prefix_len;
mod sniff;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_hook::{DecisionEngine, RuleFile};
use relay_sniff::SniffConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::output::OutputFormat;

/// hookctl - Validate relay-hook rule files and dry-run routing decisions.
#[derive(Debug, Parser)]
#[command(name = "hookctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Log level for engine diagnostics on stderr.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a rule file and list its rules in evaluation order.
    Check(check::CheckCommand),

    /// Show the routing key extracted from a captured first packet.
    Sniff(sniff::SniffCommand),

    /// Dry-run the routing decision for a captured first packet.
    Decide(decide::DecideCommand),

    /// Print the number of leading bytes the relay buffers.
    PrefixLen(prefix_len::PrefixLenCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Install a stderr subscriber; `RUST_LOG` overrides `--log-level`.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_str()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Run the CLI command.
    pub fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: self.format,
        };

        match self.command {
            Commands::Check(cmd) => cmd.run(ctx),
            Commands::Sniff(cmd) => cmd.run(ctx),
            Commands::Decide(cmd) => cmd.run(ctx),
            Commands::PrefixLen(cmd) => cmd.run(ctx),
            Commands::Version => {
                println!("hookctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
}

/// Load and validate a rule file, tagging failures with its path.
pub(crate) fn load_rule_file(path: &Path) -> Result<RuleFile> {
    debug!(path = %path.display(), "Validating rule file");
    let file = RuleFile::load(path).map_err(|e| CliError::config(path, e))?;
    file.policy_rules()
        .map_err(|e| CliError::config(path, e))?;
    Ok(file)
}

/// Build an engine the same way the relay does, or an empty one.
pub(crate) fn load_engine(rules: Option<&Path>) -> Result<DecisionEngine> {
    match rules {
        Some(path) => {
            Ok(DecisionEngine::from_rule_file(path).map_err(|e| CliError::config(path, e))?)
        }
        None => {
            debug!("No rule file given, using default limits and no rules");
            Ok(DecisionEngine::new(SniffConfig::default(), Vec::new()))
        }
    }
}
