//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use relay_hook::ConfigError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    pub fn config(path: impl Into<PathBuf>, source: ConfigError) -> Self {
        Self::Config {
            path: path.into(),
            source,
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Config { path, source } => {
                if let Some(position) = source.rule_position() {
                    eprintln!(
                        "\n{}",
                        format!(
                            "Hint: Fix rule #{} (counting [[rules]] entries from 1) in {}.",
                            position,
                            path.display()
                        )
                        .yellow()
                    );
                }
                if let ConfigError::InvalidPattern { source, .. } = source {
                    if source.is_syntax_error() {
                        eprintln!(
                            "{}",
                            "Hint: Patterns are host names; wildcards look like *.example.com."
                                .yellow()
                        );
                    }
                }
            }
            CliError::InvalidInput(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Pass a raw capture file, `-` for stdin, or add --hex for hex text."
                        .yellow()
                );
            }
        }
    }
}
