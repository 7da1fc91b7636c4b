//! First-packet sniffing for routing decisions.
//!
//! This crate turns the leading bytes a relay has buffered for a new client
//! connection into a [`RoutingKey`]: a protocol tag plus, when one can be
//! found, a normalized host name.
//!
//! ## Parsers
//!
//! Parsers are a fixed list evaluated in priority order:
//!
//! ```text
//! prefix -> [Tls ClientHello SNI] -> [Plaintext Host header] -> Unknown
//! ```
//!
//! The first parser that recognizes its protocol decides the tag, even when
//! it cannot produce a host (truncated or malformed input). Every parser is
//! bounded by the bytes present and never reads past the slice.
//!
//! ## Usage
//!
//! ```
//! use relay_sniff::{Protocol, Sniffer};
//!
//! let sniffer = Sniffer::new();
//! let key = sniffer.sniff(b"GET / HTTP/1.1\r\nHost: Example.com\r\n\r\n");
//! assert_eq!(key.protocol, Protocol::PlaintextHttpLike);
//! assert_eq!(key.host(), Some("example.com"));
//! ```

mod hostname;
mod plaintext;
mod tls;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub use hostname::{normalize_authority, normalize_host, MAX_HOST_LEN};

/// Default number of leading bytes the host is asked to buffer. Large enough
/// for hellos carrying post-quantum key shares ahead of `server_name`.
pub const DEFAULT_MAX_PREFIX_LEN: usize = 2048;

/// Smallest accepted prefix window.
pub const MIN_PREFIX_LEN: usize = 64;

/// Largest accepted prefix window: one full TLS record (header + 2^14).
pub const MAX_PREFIX_LEN: usize = 5 + (1 << 14);

/// Default bound on plaintext header scanning.
pub const DEFAULT_PLAINTEXT_SCAN_LIMIT: usize = 1024;

/// Protocol recognized in a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// TLS handshake record carrying a ClientHello.
    Tls,
    /// Plaintext request head (HTTP/1.x or the h2 preface).
    #[serde(rename = "http")]
    PlaintextHttpLike,
    /// Nothing recognized.
    Unknown,
}

impl Protocol {
    /// Short lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tls => "tls",
            Protocol::PlaintextHttpLike => "http",
            Protocol::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key extracted from a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey {
    /// Protocol tag.
    pub protocol: Protocol,
    /// Normalized host name, if one was found.
    pub host: Option<String>,
}

impl RoutingKey {
    /// Key for input no parser recognized.
    pub fn unknown() -> Self {
        Self {
            protocol: Protocol::Unknown,
            host: None,
        }
    }

    /// Key with a host for the given protocol.
    pub fn with_host(protocol: Protocol, host: impl Into<String>) -> Self {
        Self {
            protocol,
            host: Some(host.into()),
        }
    }

    /// The host name, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }
}

/// Result of a single parser over a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Host name found (normalized).
    Found(String),
    /// Protocol recognized but it carries no host name.
    NoHost,
    /// The prefix is not this protocol.
    NotApplicable,
    /// Recognized, but the prefix ends before the host name.
    Incomplete,
    /// Recognized, but the framing is inconsistent.
    Malformed,
}

impl ParseOutcome {
    /// True if the parser claimed the prefix as its protocol.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ParseOutcome::NotApplicable)
    }
}

/// Parser variants, in priority order by [`Parser::PRIORITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    /// TLS ClientHello server_name extension.
    Tls,
    /// Plaintext request line and `Host:` header.
    Plaintext,
}

impl Parser {
    /// Evaluation order. TLS first: its SNI is the most specific key.
    pub const PRIORITY: [Parser; 2] = [Parser::Tls, Parser::Plaintext];

    /// Protocol tag reported when this parser recognizes a prefix.
    pub fn protocol(&self) -> Protocol {
        match self {
            Parser::Tls => Protocol::Tls,
            Parser::Plaintext => Protocol::PlaintextHttpLike,
        }
    }

    /// Run this parser over `window`.
    pub fn parse(&self, window: &[u8], config: &SniffConfig) -> ParseOutcome {
        match self {
            Parser::Tls => tls::parse_client_hello(window),
            Parser::Plaintext => plaintext::parse_request_head(window, config.plaintext_scan_limit),
        }
    }
}

/// Sniffer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SniffConfig {
    /// Number of leading bytes inspected; also the length reported to the
    /// host as the required prefix.
    pub max_prefix_len: usize,
    /// Maximum bytes scanned by the plaintext parser.
    pub plaintext_scan_limit: usize,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            max_prefix_len: DEFAULT_MAX_PREFIX_LEN,
            plaintext_scan_limit: DEFAULT_PLAINTEXT_SCAN_LIMIT,
        }
    }
}

impl SniffConfig {
    /// Clamp limits into their supported ranges.
    pub fn clamped(self) -> Self {
        Self {
            max_prefix_len: self.max_prefix_len.clamp(MIN_PREFIX_LEN, MAX_PREFIX_LEN),
            plaintext_scan_limit: self.plaintext_scan_limit.clamp(1, MAX_PREFIX_LEN),
        }
    }
}

/// Prefix sniffer.
#[derive(Debug, Clone, Default)]
pub struct Sniffer {
    config: SniffConfig,
}

impl Sniffer {
    /// Create a sniffer with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sniffer with custom limits (clamped).
    pub fn with_config(config: SniffConfig) -> Self {
        Self {
            config: config.clamped(),
        }
    }

    /// Effective limits.
    pub fn config(&self) -> &SniffConfig {
        &self.config
    }

    /// Number of leading bytes the host should buffer before deciding.
    pub fn required_prefix_length(&self) -> u32 {
        // Clamped to MAX_PREFIX_LEN, so this never truncates.
        self.config.max_prefix_len as u32
    }

    /// Extract a routing key from `prefix`.
    ///
    /// Only the leading `max_prefix_len` bytes are inspected.
    pub fn sniff(&self, prefix: &[u8]) -> RoutingKey {
        let window = &prefix[..prefix.len().min(self.config.max_prefix_len)];

        for parser in Parser::PRIORITY {
            let outcome = parser.parse(window, &self.config);
            if !outcome.is_recognized() {
                continue;
            }

            trace!(parser = ?parser, outcome = ?outcome, "Prefix recognized");
            let host = match outcome {
                ParseOutcome::Found(host) => Some(host),
                _ => None,
            };
            return RoutingKey {
                protocol: parser.protocol(),
                host,
            };
        }

        RoutingKey::unknown()
    }

    /// Run every parser and report each outcome; used for diagnostics.
    pub fn explain(&self, prefix: &[u8]) -> Vec<(Parser, ParseOutcome)> {
        let window = &prefix[..prefix.len().min(self.config.max_prefix_len)];
        Parser::PRIORITY
            .iter()
            .map(|parser| (*parser, parser.parse(window, &self.config)))
            .collect()
    }
}
