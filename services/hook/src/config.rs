//! Hook configuration.
//!
//! Two sources:
//! - a TOML rule file (sniffer limits plus the ordered rule list)
//! - environment variables selecting the rule file and logging

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use relay_policy::{MatchKind, Matcher, Outcome, PatternError, PolicyRule};
use relay_sniff::{Protocol, SniffConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the rule file.
pub const ENV_RULES: &str = "RELAY_HOOK_RULES";
/// Enables the hook's own log subscriber.
pub const ENV_LOG: &str = "RELAY_HOOK_LOG";
/// Fallback log filter when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "RELAY_HOOK_LOG_LEVEL";
/// Log output format (`json` or `text`).
pub const ENV_LOG_FORMAT: &str = "RELAY_HOOK_LOG_FORMAT";

/// Errors from loading or validating a rule file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule file: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("rule #{position}: {source}")]
    InvalidPattern {
        position: usize,
        #[source]
        source: PatternError,
    },

    #[error("rule #{position}: invalid action: {reason}")]
    InvalidAction { position: usize, reason: String },
}

impl ConfigError {
    /// 1-based position of the offending rule, if the error is rule-specific.
    pub fn rule_position(&self) -> Option<usize> {
        match self {
            ConfigError::InvalidPattern { position, .. }
            | ConfigError::InvalidAction { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Action as written in the rule file: `"ban"`, `"default"`, or an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSpec {
    Remote(i64),
    Keyword(String),
}

impl ActionSpec {
    fn to_outcome(&self) -> Result<Outcome, String> {
        match self {
            ActionSpec::Remote(idx) => u32::try_from(*idx)
                .ok()
                .filter(|idx| *idx <= i32::MAX as u32)
                .map(Outcome::Remote)
                .ok_or_else(|| format!("remote index {idx} out of range")),
            ActionSpec::Keyword(word) => match word.to_ascii_lowercase().as_str() {
                "ban" => Ok(Outcome::Ban),
                "default" => Ok(Outcome::Remote(0)),
                other => Err(format!("unknown action '{other}'")),
            },
        }
    }
}

/// One `[[rules]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    #[serde(rename = "match")]
    pub kind: MatchKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    pub action: ActionSpec,
}

impl RuleEntry {
    fn to_rule(&self, position: usize) -> Result<PolicyRule, ConfigError> {
        let matcher = Matcher::parse(self.kind, self.pattern.as_deref())
            .map_err(|source| ConfigError::InvalidPattern { position, source })?;
        let outcome = self
            .action
            .to_outcome()
            .map_err(|reason| ConfigError::InvalidAction { position, reason })?;

        Ok(PolicyRule {
            matcher,
            outcome,
            protocol: self.protocol,
        })
    }
}

/// Parsed rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub sniff: SniffConfig,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl RuleFile {
    /// Parse a rule file from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a rule file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate every entry, reporting the first bad one by 1-based position.
    pub fn policy_rules(&self) -> Result<Vec<PolicyRule>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.to_rule(i + 1))
            .collect()
    }
}

/// Hook settings (env-driven).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSettings {
    /// Rule file; `None` runs with an empty rule set.
    pub rules_path: Option<PathBuf>,

    /// Install the hook's own tracing subscriber.
    pub log_enabled: bool,

    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines instead of text.
    pub log_json: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            rules_path: None,
            log_enabled: false,
            log_level: "info".to_string(),
            log_json: true,
        }
    }
}

impl HookSettings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rules_path = lookup(ENV_RULES)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let log_enabled = lookup(ENV_LOG)
            .map(|v| parse_flag(&v))
            .transpose()
            .with_context(|| format!("{ENV_LOG} must be a boolean (1/0/true/false)."))?
            .unwrap_or(false);

        let log_level = lookup(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string());

        let log_json = match lookup(ENV_LOG_FORMAT).as_deref() {
            None | Some("json") => true,
            Some("text") => false,
            Some(other) => bail!("{ENV_LOG_FORMAT} must be 'json' or 'text', got '{other}'."),
        };

        Ok(Self {
            rules_path,
            log_enabled,
            log_level,
            log_json,
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("unrecognized boolean '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[sniff]
max_prefix_len = 2048

[[rules]]
match = "suffix"
pattern = "example.com"
action = "ban"

[[rules]]
match = "exact"
pattern = "svc.internal"
protocol = "tls"
action = 2

[[rules]]
match = "any"
action = "default"
"#;

    #[test]
    fn test_parse_sample() {
        let file = RuleFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(file.sniff.max_prefix_len, 2048);
        assert_eq!(
            file.sniff.plaintext_scan_limit,
            SniffConfig::default().plaintext_scan_limit
        );

        let rules = file.policy_rules().unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0], PolicyRule::ban(Matcher::suffix("example.com").unwrap()));
        assert_eq!(
            rules[1],
            PolicyRule::remote(Matcher::exact("svc.internal").unwrap(), 2)
                .for_protocol(Protocol::Tls)
        );
        assert_eq!(rules[2], PolicyRule::remote(Matcher::Any, 0));
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = RuleFile::from_toml_str("").unwrap();
        assert_eq!(file, RuleFile::default());
        assert!(file.policy_rules().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_reports_position() {
        let text = r#"
[[rules]]
match = "any"
action = 1

[[rules]]
match = "wildcard"
pattern = "example.com"
action = 1
"#;
        let err = RuleFile::from_toml_str(text)
            .unwrap()
            .policy_rules()
            .unwrap_err();
        assert_eq!(err.rule_position(), Some(2));
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_actions() {
        for action in ["-1", "\"drop\"", "4294967296"] {
            let text = format!("[[rules]]\nmatch = \"any\"\naction = {action}\n");
            let err = RuleFile::from_toml_str(&text)
                .unwrap()
                .policy_rules()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidAction { position: 1, .. }),
                "{action}: {err}"
            );
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let text = "[[rules]]\nmatch = \"any\"\naction = 1\nweight = 3\n";
        assert!(matches!(
            RuleFile::from_toml_str(text),
            Err(ConfigError::Syntax(_))
        ));
    }

    #[test]
    fn test_misspelled_sniff_key_rejected() {
        let text = "[sniff]\nmax_prefix = 4096\n";
        assert!(matches!(
            RuleFile::from_toml_str(text),
            Err(ConfigError::Syntax(_))
        ));
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_RULES, "/etc/relay/rules.toml"),
            (ENV_LOG, "true"),
            (ENV_LOG_FORMAT, "text"),
        ]
        .into_iter()
        .collect();

        let settings =
            HookSettings::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(
            settings.rules_path.as_deref(),
            Some(Path::new("/etc/relay/rules.toml"))
        );
        assert!(settings.log_enabled);
        assert!(!settings.log_json);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_settings_defaults_and_errors() {
        let settings = HookSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.rules_path, None);
        assert!(!settings.log_enabled);
        assert!(settings.log_json);

        let err = HookSettings::from_lookup(|name| (name == ENV_LOG).then(|| "maybe".into()));
        assert!(err.is_err());
    }
}
