//! Loading captured first packets.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::CliError;

/// Read a capture from a file, or stdin when `source` is `-`.
///
/// With `hex`, the content is hex text (whitespace ignored).
pub fn read_capture(source: &str, hex: bool) -> Result<Vec<u8>> {
    let raw = if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read capture from stdin")?;
        buf
    } else {
        std::fs::read(Path::new(source))
            .with_context(|| format!("Failed to read capture file {source}"))?
    };

    if hex {
        decode_hex(&raw)
    } else {
        Ok(raw)
    }
}

pub fn decode_hex(raw: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(&compact).map_err(|e| CliError::InvalidInput(format!("bad hex: {e}")).into())
}
