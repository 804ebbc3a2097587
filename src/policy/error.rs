// ABOUTME: Configuration errors for retention policy input.
// ABOUTME: Raised before any deletion is attempted.

/// Malformed retention policy input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("expected PREFIX=COUNT (e.g. release=4), got '{0}'")]
    MalformedRule(String),

    #[error("tag prefix cannot be empty")]
    EmptyPrefix,

    #[error("expected N in {prefix}=N to be a non-negative integer, got '{value}'")]
    InvalidCount { prefix: String, value: String },

    #[error("keep count for prefix '{prefix}' cannot be negative: {count}")]
    NegativeCount { prefix: String, count: i64 },
}
