//! Error types for rule pattern validation.

use thiserror::Error;

/// Errors that can occur when building a matcher from a pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern is empty.
    #[error("pattern cannot be empty")]
    Empty,

    /// A pattern is required for this match kind.
    #[error("match kind '{kind}' requires a pattern")]
    MissingPattern { kind: &'static str },

    /// `any` rules take no pattern.
    #[error("match kind 'any' takes no pattern, got '{0}'")]
    UnexpectedPattern(String),

    /// The pattern is not a valid host name.
    #[error("invalid host name pattern: '{0}'")]
    InvalidHost(String),

    /// Wildcard patterns must start with `*.`.
    #[error("wildcard pattern must start with '*.', got '{0}'")]
    MissingWildcard(String),

    /// Only a single leftmost `*` label is supported.
    #[error("only a single leftmost '*' label is supported, got '{0}'")]
    UnsupportedWildcard(String),
}

impl PatternError {
    /// Returns true if the pattern text itself was rejected (as opposed to
    /// being missing or superfluous).
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            PatternError::InvalidHost(_)
                | PatternError::MissingWildcard(_)
                | PatternError::UnsupportedWildcard(_)
        )
    }
}
