//! Rule table with atomic snapshot replacement.
//!
//! - Readers load the current snapshot without locking
//! - Reload installs a whole new snapshot in a single pointer swap
//! - In-flight readers keep the snapshot they loaded until they drop it

use std::sync::Arc;

use arc_swap::ArcSwap;
use relay_sniff::RoutingKey;
use tracing::info;

use crate::evaluate::{explain, Decision, Verdict};
use crate::rule::PolicyRule;

/// Immutable, ordered rule list.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
    /// Incremented on every install; 0 is the initial empty table.
    pub generation: u64,
    pub rules: Vec<PolicyRule>,
}

impl RuleSnapshot {
    pub fn evaluate(&self, key: &RoutingKey, max_remote_idx: i32) -> Decision {
        self.explain(key, max_remote_idx).decision
    }

    pub fn explain(&self, key: &RoutingKey, max_remote_idx: i32) -> Verdict {
        explain(&self.rules, key, max_remote_idx)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rule table shared by every decision call.
///
/// A decision loads one snapshot and evaluates against it; an update installs
/// a whole new list, so a reader never sees half of a reload.
pub struct RuleTable {
    snapshot: ArcSwap<RuleSnapshot>,
}

impl RuleTable {
    /// Create an empty table (every decision is the default peer).
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RuleSnapshot::default()),
        }
    }

    /// Create a table holding `rules` as generation 1.
    pub fn with_rules(rules: Vec<PolicyRule>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RuleSnapshot {
                generation: 1,
                rules,
            }),
        }
    }

    /// Replace the whole rule list atomically and return the new generation.
    pub fn update(&self, rules: Vec<PolicyRule>) -> u64 {
        let rule_count = rules.len();
        let previous = self.snapshot.rcu(|current| RuleSnapshot {
            generation: current.generation + 1,
            rules: rules.clone(),
        });
        let generation = previous.generation + 1;

        info!(
            rule_count = rule_count,
            generation = generation,
            "Rule table updated atomically"
        );
        generation
    }

    /// Current snapshot. Hold it for the duration of one decision.
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        self.snapshot.load_full()
    }

    /// Evaluate against the current snapshot.
    pub fn evaluate(&self, key: &RoutingKey, max_remote_idx: i32) -> Decision {
        self.snapshot.load().evaluate(key, max_remote_idx)
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("RuleTable")
            .field("generation", &snapshot.generation)
            .field("rules", &snapshot.rules.len())
            .finish()
    }
}

/// Shared rule table reference.
pub type SharedRuleTable = Arc<RuleTable>;
