//! Host name matchers.
//!
//! Patterns are normalized exactly like sniffed host names, so matching is a
//! plain byte comparison.
//!
//! # Supported patterns
//! - `exact`: `api.example.com` matches only `api.example.com`; an IPv6
//!   literal (`::1` or `[::1]`) matches the canonical address a plaintext
//!   authority normalizes to
//! - `suffix`: `example.com` matches `example.com` and `a.b.example.com`,
//!   not `badexample.com` (a leading dot is accepted and ignored)
//! - `wildcard`: `*.example.com` matches `api.example.com`, not
//!   `example.com` or `a.b.example.com`
//! - `any`: matches every key, including keys without a host

use std::fmt;
use std::net::Ipv6Addr;

use relay_sniff::normalize_host;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Kind of matcher, as written in rule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Suffix,
    Wildcard,
    Any,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Suffix => "suffix",
            MatchKind::Wildcard => "wildcard",
            MatchKind::Any => "any",
        }
    }
}

/// A validated host matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// Host equals the name.
    Exact(String),
    /// Host equals the domain or is below it.
    Suffix(String),
    /// Host is exactly one label below the base domain.
    Wildcard(String),
    /// Matches everything.
    Any,
}

impl Matcher {
    /// Build a matcher from its configured kind and pattern.
    pub fn parse(kind: MatchKind, pattern: Option<&str>) -> Result<Self, PatternError> {
        match (kind, pattern) {
            (MatchKind::Any, None) => Ok(Matcher::Any),
            (MatchKind::Any, Some(p)) => Err(PatternError::UnexpectedPattern(p.to_string())),
            (kind, None) => Err(PatternError::MissingPattern {
                kind: kind.as_str(),
            }),
            (MatchKind::Exact, Some(p)) => Self::exact(p),
            (MatchKind::Suffix, Some(p)) => Self::suffix(p),
            (MatchKind::Wildcard, Some(p)) => Self::wildcard(p),
        }
    }

    /// Exact host match.
    pub fn exact(pattern: &str) -> Result<Self, PatternError> {
        if let Some(addr) = ipv6_literal(pattern) {
            return Ok(Matcher::Exact(addr.to_string()));
        }
        host_pattern(pattern).map(Matcher::Exact)
    }

    /// Domain suffix match on a label boundary.
    pub fn suffix(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        let domain = trimmed.strip_prefix('.').unwrap_or(trimmed);
        host_pattern(domain).map(Matcher::Suffix)
    }

    /// Single-label leftmost wildcard (`*.example.com`).
    pub fn wildcard(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }
        let Some(base) = trimmed.strip_prefix("*.") else {
            return Err(if trimmed.contains('*') {
                PatternError::UnsupportedWildcard(trimmed.to_string())
            } else {
                PatternError::MissingWildcard(trimmed.to_string())
            });
        };
        if base.contains('*') {
            return Err(PatternError::UnsupportedWildcard(trimmed.to_string()));
        }
        host_pattern(base).map(Matcher::Wildcard)
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            Matcher::Exact(_) => MatchKind::Exact,
            Matcher::Suffix(_) => MatchKind::Suffix,
            Matcher::Wildcard(_) => MatchKind::Wildcard,
            Matcher::Any => MatchKind::Any,
        }
    }

    /// Check a normalized host (or its absence) against this matcher.
    pub fn matches(&self, host: Option<&str>) -> bool {
        match (self, host) {
            (Matcher::Any, _) => true,
            (_, None) => false,
            (Matcher::Exact(name), Some(host)) => host == name,
            (Matcher::Suffix(domain), Some(host)) => {
                host == domain || is_below(host, domain).is_some()
            }
            (Matcher::Wildcard(base), Some(host)) => {
                is_below(host, base).is_some_and(|label| !label.contains('.'))
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(name) => write!(f, "exact:{name}"),
            Matcher::Suffix(domain) => write!(f, "suffix:{domain}"),
            Matcher::Wildcard(base) => write!(f, "wildcard:*.{base}"),
            Matcher::Any => f.write_str("any"),
        }
    }
}

/// If `host` is a strict subdomain of `domain`, return the part in front
/// of `.domain`.
fn is_below<'a>(host: &'a str, domain: &str) -> Option<&'a str> {
    let prefix = host.strip_suffix(domain)?.strip_suffix('.')?;
    (!prefix.is_empty()).then_some(prefix)
}

fn ipv6_literal(pattern: &str) -> Option<Ipv6Addr> {
    let trimmed = pattern.trim();
    let literal = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    literal.parse().ok()
}

fn host_pattern(pattern: &str) -> Result<String, PatternError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(PatternError::Empty);
    }
    normalize_host(trimmed).ok_or_else(|| PatternError::InvalidHost(trimmed.to_string()))
}
