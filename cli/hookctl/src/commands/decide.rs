//! Decide command (dry-run a routing decision).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use relay_hook::DecisionEngine;
use relay_policy::Decision;
use relay_sniff::RoutingKey;
use serde::Serialize;

use crate::input::read_capture;
use crate::output::{display_option, print_single, OutputFormat};

use super::{load_engine, CommandContext};

/// Decide command - evaluate the rule file against a captured first packet.
#[derive(Debug, Args)]
pub struct DecideCommand {
    /// Capture file, or `-` for stdin.
    input: String,

    /// Rule file; without one every connection uses the default remote.
    #[arg(long, env = "RELAY_HOOK_RULES")]
    rules: Option<PathBuf>,

    /// Highest remote index the relay has configured.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub(super) max_remote_idx: i32,

    /// Input is hex text rather than raw bytes.
    #[arg(long)]
    hex: bool,
}

#[derive(Debug, Serialize)]
struct DecideReport {
    key: RoutingKey,
    decision: Decision,
    banned: bool,
    /// Value the relay receives from the hook.
    remote_idx: i32,
    /// 1-based position in the rule file.
    rule_position: Option<usize>,
    rule: Option<String>,
    generation: u64,
}

impl DecideCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let data = read_capture(&self.input, self.hex)?;
        let engine = load_engine(self.rules.as_deref())?;
        let report = build_report(&engine, &data, self.max_remote_idx);

        match ctx.format {
            OutputFormat::Json => print_single(&report),
            OutputFormat::Table => {
                println!("Protocol:   {}", report.key.protocol);
                println!("Host:       {}", display_option(&report.key.host));
                println!(
                    "Rule:       {}",
                    match (&report.rule_position, &report.rule) {
                        (Some(pos), Some(rule)) => format!("#{pos} {rule}"),
                        _ => "none matched".dimmed().to_string(),
                    }
                );
                println!("Decision:   {}", describe_decision(report.decision));
                println!("Remote idx: {}", report.remote_idx);
            }
        }

        Ok(())
    }
}

fn build_report(engine: &DecisionEngine, data: &[u8], max_remote_idx: i32) -> DecideReport {
    let explanation = engine.explain(data, max_remote_idx);
    let snapshot = engine.rule_table().snapshot();

    // Nothing reloads here, so this is the snapshot the explanation used.
    let rule = explanation
        .rule
        .and_then(|idx| snapshot.rules.get(idx))
        .map(ToString::to_string);

    DecideReport {
        remote_idx: explanation.decision.as_remote_idx(),
        banned: explanation.decision.is_banned(),
        decision: explanation.decision,
        rule_position: explanation.rule.map(|idx| idx + 1),
        rule,
        key: explanation.key,
        generation: explanation.generation,
    }
}

fn describe_decision(decision: Decision) -> String {
    match decision {
        Decision::Default => "default remote".to_string(),
        Decision::Selected(idx) => format!("remote {idx}").green().to_string(),
        Decision::Banned => "banned".red().bold().to_string(),
    }
}
