//! Host name normalization shared by every parser.
//!
//! A routing key is only ever produced through these functions, so rule
//! patterns and sniffed names compare byte-for-byte after normalization:
//! - ASCII only, lower-cased
//! - a single trailing dot trimmed
//! - labels of `[a-z0-9_-]`, 1..=63 bytes, total length at most 253

use std::net::Ipv6Addr;

/// Longest host name accepted (RFC 1035 presentation form without the root dot).
pub const MAX_HOST_LEN: usize = 253;

/// Longest single label.
pub const MAX_LABEL_LEN: usize = 63;

/// Normalize a DNS-style host name given as raw bytes.
///
/// Returns `None` when the bytes are not a plausible host name.
pub fn normalize_host_bytes(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b".").unwrap_or(raw);
    if raw.is_empty() || raw.len() > MAX_HOST_LEN {
        return None;
    }

    for label in raw.split(|&b| b == b'.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return None;
        }
        if !label
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return None;
        }
    }

    // Every byte is ASCII at this point.
    let mut host = String::with_capacity(raw.len());
    host.extend(raw.iter().map(|&b| b.to_ascii_lowercase() as char));
    Some(host)
}

/// Normalize a DNS-style host name.
pub fn normalize_host(raw: &str) -> Option<String> {
    normalize_host_bytes(raw.as_bytes())
}

/// Normalize an HTTP authority (`host`, `host:port`, `[v6]`, `[v6]:port`),
/// dropping the port. IPv6 literals come back in canonical form without
/// brackets.
pub fn normalize_authority(raw: &str) -> Option<String> {
    let raw = raw.trim();

    // userinfo is not part of the routing key
    let raw = match raw.rsplit_once('@') {
        Some((_, host)) => host,
        None => raw,
    };

    if let Some(rest) = raw.strip_prefix('[') {
        let (literal, tail) = rest.split_once(']')?;
        if !(tail.is_empty() || is_port_suffix(tail)) {
            return None;
        }
        let addr: Ipv6Addr = literal.parse().ok()?;
        return Some(addr.to_string());
    }

    let host = match raw.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
        Some(_) => return None,
        None => raw,
    };

    normalize_host(host)
}

fn is_port_suffix(tail: &str) -> bool {
    tail.strip_prefix(':')
        .is_some_and(|port| port.bytes().all(|b| b.is_ascii_digit()))
}
