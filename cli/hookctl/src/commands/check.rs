//! Check command (validate a rule file).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use relay_hook::{ConfigError, RuleFile};
use relay_policy::{Matcher, Outcome, PolicyRule};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_single, OutputFormat};

use super::{load_rule_file, CommandContext};

/// Check command - parse every rule and report the effective limits.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Rule file to validate.
    rules: PathBuf,
}

#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Match")]
    kind: String,
    #[tabled(rename = "Pattern")]
    pattern: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Action")]
    action: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    max_prefix_len: usize,
    plaintext_scan_limit: usize,
    rules: Vec<RuleRow>,
}

impl CheckCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let file = load_rule_file(&self.rules)?;
        let report = build_report(&file).map_err(|e| CliError::config(&self.rules, e))?;

        match ctx.format {
            OutputFormat::Json => print_single(&report),
            OutputFormat::Table => {
                print_output(&report.rules, OutputFormat::Table);
                println!();
                println!(
                    "{} {} rules, prefix length {} bytes, plaintext scan limit {} bytes",
                    "OK".green().bold(),
                    report.rules.len(),
                    report.max_prefix_len,
                    report.plaintext_scan_limit
                );
            }
        }

        Ok(())
    }
}

/// Rows show rules as the engine holds them, with patterns normalized.
fn build_report(file: &RuleFile) -> Result<CheckReport, ConfigError> {
    let sniff = file.sniff.clamped();
    let rules = file.policy_rules()?;
    Ok(CheckReport {
        max_prefix_len: sniff.max_prefix_len,
        plaintext_scan_limit: sniff.plaintext_scan_limit,
        rules: rules
            .iter()
            .enumerate()
            .map(|(i, rule)| rule_row(i + 1, rule))
            .collect(),
    })
}

fn rule_row(position: usize, rule: &PolicyRule) -> RuleRow {
    RuleRow {
        position,
        kind: rule.matcher.kind().as_str().to_string(),
        pattern: match &rule.matcher {
            Matcher::Exact(name) | Matcher::Suffix(name) => name.clone(),
            Matcher::Wildcard(base) => format!("*.{base}"),
            Matcher::Any => "-".to_string(),
        },
        protocol: rule
            .protocol
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "any".to_string()),
        action: match rule.outcome {
            Outcome::Remote(0) => "default".to_string(),
            outcome => outcome.to_string(),
        },
    }
}
