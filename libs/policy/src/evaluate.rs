//! Ordered rule evaluation.
//!
//! Ban and selection rules share one ordered pass. The first rule that
//! matches decides, with one exception: a rule selecting a peer above the
//! caller's bound is treated as non-matching and evaluation continues.

use relay_sniff::RoutingKey;
use serde::Serialize;

use crate::rule::{Outcome, PolicyRule};

/// Routing decision for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Forward to the default peer (index 0).
    Default,
    /// Forward to this peer; always within `1..=max_remote_idx`.
    Selected(u32),
    /// Refuse the connection.
    Banned,
}

impl Decision {
    /// Wire encoding: negative bans, zero is the default peer, positive N
    /// selects peer N.
    pub fn as_remote_idx(&self) -> i32 {
        match self {
            Decision::Default => 0,
            // Selected indices never exceed a non-negative i32 bound.
            Decision::Selected(idx) => i32::try_from(*idx).unwrap_or(0),
            Decision::Banned => -1,
        }
    }

    pub fn is_banned(&self) -> bool {
        matches!(self, Decision::Banned)
    }
}

/// A decision plus the position of the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    /// Index into the rule list; `None` when no rule matched.
    pub rule: Option<usize>,
}

/// Evaluate `rules` in order against `key`.
///
/// A negative `max_remote_idx` is treated as 0.
pub fn evaluate(rules: &[PolicyRule], key: &RoutingKey, max_remote_idx: i32) -> Decision {
    explain(rules, key, max_remote_idx).decision
}

/// Like [`evaluate`], also reporting which rule decided.
pub fn explain(rules: &[PolicyRule], key: &RoutingKey, max_remote_idx: i32) -> Verdict {
    let bound = max_remote_idx.max(0) as u32;

    for (position, rule) in rules.iter().enumerate() {
        if !rule.matches(key) {
            continue;
        }

        let decision = match rule.outcome {
            Outcome::Ban => Decision::Banned,
            Outcome::Remote(idx) if idx > bound => continue,
            Outcome::Remote(0) => Decision::Default,
            Outcome::Remote(idx) => Decision::Selected(idx),
        };
        return Verdict {
            decision,
            rule: Some(position),
        };
    }

    Verdict {
        decision: Decision::Default,
        rule: None,
    }
}
