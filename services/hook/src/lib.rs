//! relay-hook
//!
//! First-packet routing hook for TCP/UDP relays.
//!
//! This library:
//! - Reports how many leading client bytes the relay must buffer
//! - Sniffs TLS SNI or a plaintext Host from that prefix
//! - Evaluates ordered routing/ban rules into a remote index or a ban
//! - Reloads rules atomically without disturbing in-flight decisions
//! - Exports the decision as a C ABI for the relay's hook loader
//!
//! ## Architecture
//!
//! ```text
//! Relay -> realm_decide_remote_idx -> DecisionEngine -> Sniffer -> RuleTable
//!                                                            |
//!                                          Decision (-1 ban / 0 default / N)
//! ```

pub mod config;
pub mod engine;
pub mod ffi;
pub mod telemetry;

pub use config::{ActionSpec, ConfigError, HookSettings, RuleEntry, RuleFile};
pub use engine::{DecisionEngine, Explanation};
pub use relay_policy::{Decision, Matcher, Outcome, PolicyRule, RuleTable};
pub use relay_sniff::{Protocol, RoutingKey, SniffConfig, Sniffer};
