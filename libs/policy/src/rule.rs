//! Policy rules: a matcher bound to an outcome.

use std::fmt;

use relay_sniff::{Protocol, RoutingKey};
use serde::{Deserialize, Serialize};

use crate::matcher::Matcher;

/// What a matching rule does with the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Forward to the remote peer with this index (0 = default).
    Remote(u32),
    /// Refuse the connection.
    Ban,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Remote(idx) => write!(f, "remote {idx}"),
            Outcome::Ban => f.write_str("ban"),
        }
    }
}

/// One ordered entry of the rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub matcher: Matcher,
    pub outcome: Outcome,
    /// Restrict the rule to keys of this protocol.
    pub protocol: Option<Protocol>,
}

impl PolicyRule {
    pub fn new(matcher: Matcher, outcome: Outcome) -> Self {
        Self {
            matcher,
            outcome,
            protocol: None,
        }
    }

    /// Rule selecting remote peer `idx`.
    pub fn remote(matcher: Matcher, idx: u32) -> Self {
        Self::new(matcher, Outcome::Remote(idx))
    }

    /// Rule banning matching connections.
    pub fn ban(matcher: Matcher) -> Self {
        Self::new(matcher, Outcome::Ban)
    }

    /// Restrict this rule to a protocol.
    pub fn for_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Check the key's protocol and host against this rule.
    pub fn matches(&self, key: &RoutingKey) -> bool {
        if self.protocol.is_some_and(|p| p != key.protocol) {
            return false;
        }
        self.matcher.matches(key.host())
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Some(protocol) => write!(f, "{} [{}] -> {}", self.matcher, protocol, self.outcome),
            None => write!(f, "{} -> {}", self.matcher, self.outcome),
        }
    }
}
