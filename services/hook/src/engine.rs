//! Decision engine facade.
//!
//! ```text
//! prefix -> Sniffer -> RoutingKey -> RuleTable snapshot -> Decision
//! ```
//!
//! The engine answers the two questions the relay asks: how many leading
//! bytes to buffer, and which remote peer (or a ban) a buffered prefix maps
//! to. The prefix window is fixed when the engine is built; reloads replace
//! the rule list only, so a host that cached the required length never sees
//! it change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use relay_policy::{Decision, PolicyRule, RuleTable, SharedRuleTable, Verdict};
use relay_sniff::{RoutingKey, SniffConfig, Sniffer};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, HookSettings, RuleFile};

/// Full account of a single decision, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub key: RoutingKey,
    pub decision: Decision,
    /// 0-based position of the deciding rule.
    pub rule: Option<usize>,
    pub generation: u64,
}

/// First-packet decision engine.
#[derive(Debug)]
pub struct DecisionEngine {
    sniffer: Sniffer,
    table: SharedRuleTable,
    rules_path: Option<PathBuf>,
}

impl DecisionEngine {
    /// Create an engine with fixed sniffer limits and an initial rule list.
    pub fn new(sniff: SniffConfig, rules: Vec<PolicyRule>) -> Self {
        Self {
            sniffer: Sniffer::with_config(sniff),
            table: Arc::new(RuleTable::with_rules(rules)),
            rules_path: None,
        }
    }

    /// Create an engine sharing an existing rule table.
    pub fn with_table(sniff: SniffConfig, table: SharedRuleTable) -> Self {
        Self {
            sniffer: Sniffer::with_config(sniff),
            table,
            rules_path: None,
        }
    }

    /// Build an engine from a rule file; later [`reload_from_file`] calls
    /// re-read the same path.
    ///
    /// [`reload_from_file`]: DecisionEngine::reload_from_file
    pub fn from_rule_file(path: &Path) -> Result<Self, ConfigError> {
        let file = RuleFile::load(path)?;
        let rules = file.policy_rules()?;

        info!(
            path = %path.display(),
            rule_count = rules.len(),
            max_prefix_len = file.sniff.max_prefix_len,
            "Rule file loaded"
        );

        let mut engine = Self::new(file.sniff, rules);
        engine.rules_path = Some(path.to_path_buf());
        Ok(engine)
    }

    /// Build an engine from hook settings. Never fails: a missing or broken
    /// rule file leaves an empty rule set, so every decision is the default
    /// peer until a reload succeeds.
    pub fn from_settings(settings: &HookSettings) -> Self {
        let Some(path) = settings.rules_path.as_deref() else {
            info!("No rule file configured, every connection uses the default remote");
            return Self::new(SniffConfig::default(), Vec::new());
        };

        match Self::from_rule_file(path) {
            Ok(engine) => engine,
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load rule file, starting with an empty rule set"
                );
                let mut engine = Self::new(SniffConfig::default(), Vec::new());
                engine.rules_path = Some(path.to_path_buf());
                engine
            }
        }
    }

    /// Number of leading bytes the host must buffer before calling
    /// [`decide`](DecisionEngine::decide).
    pub fn required_prefix_length(&self) -> u32 {
        self.sniffer.required_prefix_length()
    }

    /// Decide where a connection goes from its first bytes.
    ///
    /// `prefix` may be shorter than the required length (early close) or
    /// longer (only the leading window is inspected). A negative
    /// `max_remote_idx` is treated as 0.
    pub fn decide(&self, prefix: &[u8], max_remote_idx: i32) -> Decision {
        let key = self.sniffer.sniff(prefix);
        self.table.evaluate(&key, max_remote_idx)
    }

    /// Like [`decide`](DecisionEngine::decide), reporting the key and rule.
    pub fn explain(&self, prefix: &[u8], max_remote_idx: i32) -> Explanation {
        let key = self.sniffer.sniff(prefix);
        let snapshot = self.table.snapshot();
        let Verdict { decision, rule } = snapshot.explain(&key, max_remote_idx);

        Explanation {
            key,
            decision,
            rule,
            generation: snapshot.generation,
        }
    }

    /// Install a new rule list atomically; returns its generation.
    pub fn reload(&self, rules: Vec<PolicyRule>) -> u64 {
        self.table.update(rules)
    }

    /// Re-read the rule file this engine was built from.
    ///
    /// On error the current rules stay installed. Sniffer limits in the new
    /// file are ignored; they only take effect on restart.
    pub fn reload_from_file(&self) -> Result<u64, ConfigError> {
        let Some(path) = self.rules_path.as_deref() else {
            debug!("Reload requested without a rule file, keeping current rules");
            return Ok(self.table.generation());
        };

        let file = RuleFile::load(path)?;
        let rules = file.policy_rules()?;

        if file.sniff.clamped() != *self.sniffer.config() {
            warn!(
                path = %path.display(),
                "Sniffer limits changed in rule file; restart to apply them"
            );
        }

        Ok(self.reload(rules))
    }

    pub fn sniffer(&self) -> &Sniffer {
        &self.sniffer
    }

    pub fn rule_table(&self) -> &SharedRuleTable {
        &self.table
    }

    pub fn rules_path(&self) -> Option<&Path> {
        self.rules_path.as_deref()
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(SniffConfig::default(), Vec::new())
    }
}
