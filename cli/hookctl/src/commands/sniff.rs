//! Sniff command (extract the routing key from a capture).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use relay_sniff::{ParseOutcome, Parser, RoutingKey, Sniffer};
use serde::Serialize;
use tabled::Tabled;

use crate::input::read_capture;
use crate::output::{display_option, print_output, print_single, OutputFormat};

use super::{load_engine, CommandContext};

/// Sniff command - run every parser over a captured first packet.
#[derive(Debug, Args)]
pub struct SniffCommand {
    /// Capture file, or `-` for stdin.
    input: String,

    /// Input is hex text rather than raw bytes.
    #[arg(long)]
    hex: bool,

    /// Take sniffer limits from this rule file.
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[derive(Debug, Serialize, Tabled)]
struct ParserRow {
    #[tabled(rename = "Parser")]
    parser: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

#[derive(Debug, Serialize)]
struct SniffReport {
    key: RoutingKey,
    captured: usize,
    inspected: usize,
    parsers: Vec<ParserRow>,
}

impl SniffCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let data = read_capture(&self.input, self.hex)?;
        let engine = load_engine(self.rules.as_deref())?;
        let report = build_report(engine.sniffer(), &data);

        match ctx.format {
            OutputFormat::Json => print_single(&report),
            OutputFormat::Table => {
                println!("Protocol:  {}", report.key.protocol);
                println!("Host:      {}", display_option(&report.key.host));
                println!(
                    "Inspected: {} of {} bytes",
                    report.inspected, report.captured
                );
                println!();
                print_output(&report.parsers, OutputFormat::Table);
            }
        }

        Ok(())
    }
}

fn build_report(sniffer: &Sniffer, data: &[u8]) -> SniffReport {
    SniffReport {
        key: sniffer.sniff(data),
        captured: data.len(),
        inspected: data.len().min(sniffer.config().max_prefix_len),
        parsers: sniffer
            .explain(data)
            .into_iter()
            .map(|(parser, outcome)| ParserRow {
                parser: parser_name(parser).to_string(),
                outcome: describe_outcome(&outcome),
            })
            .collect(),
    }
}

fn parser_name(parser: Parser) -> &'static str {
    match parser {
        Parser::Tls => "tls",
        Parser::Plaintext => "plaintext",
    }
}

fn describe_outcome(outcome: &ParseOutcome) -> String {
    match outcome {
        ParseOutcome::Found(host) => format!("found {host}"),
        ParseOutcome::NoHost => "no host".to_string(),
        ParseOutcome::NotApplicable => "not applicable".to_string(),
        ParseOutcome::Incomplete => "incomplete".to_string(),
        ParseOutcome::Malformed => "malformed".to_string(),
    }
}
