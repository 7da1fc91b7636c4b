//! Routing policy over sniffed routing keys.
//!
//! This crate provides:
//! - Host matchers (exact, suffix, wildcard, match-all)
//! - Policy rules binding a matcher to a remote index or a ban
//! - First-match evaluation bounded by the caller's highest remote index
//! - A rule table whose snapshot is swapped atomically on reload
//!
//! ## Usage
//!
//! ```
//! use relay_policy::{Decision, Matcher, PolicyRule, RuleTable};
//! use relay_sniff::{Protocol, RoutingKey};
//!
//! let table = RuleTable::with_rules(vec![
//!     PolicyRule::ban(Matcher::suffix("example.com").unwrap()),
//!     PolicyRule::remote(Matcher::exact("svc.internal").unwrap(), 2),
//! ]);
//!
//! let key = RoutingKey::with_host(Protocol::Tls, "svc.internal");
//! assert_eq!(table.evaluate(&key, 3), Decision::Selected(2));
//! ```

mod error;
mod evaluate;
mod matcher;
mod rule;
mod table;

pub use error::PatternError;
pub use evaluate::{evaluate, explain, Decision, Verdict};
pub use matcher::{MatchKind, Matcher};
pub use rule::{Outcome, PolicyRule};
pub use table::{RuleSnapshot, RuleTable, SharedRuleTable};
