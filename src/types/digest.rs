// ABOUTME: Content digest identifying an image within a repository.
// ABOUTME: Validates the `algorithm:encoded` form used by OCI registries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Number of characters shown by [`Digest::short`].
const SHORT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("digest cannot be empty")]
    Empty,

    #[error("digest is missing the algorithm separator ':': {0}")]
    MissingAlgorithm(String),

    #[error("invalid character in digest algorithm: '{0}'")]
    InvalidAlgorithmChar(char),

    #[error("invalid character in digest: '{0}'")]
    InvalidChar(char),

    #[error("digest has an empty encoded part: {0}")]
    EmptyEncoded(String),
}

/// A content-addressed image identifier such as `sha256:3f4a...`.
///
/// Ordering is lexicographic on the full string, which is what the retention
/// engine uses to break push-time ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn parse(input: &str) -> Result<Self, DigestError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DigestError::Empty);
        }

        let (algorithm, encoded) = input
            .split_once(':')
            .ok_or_else(|| DigestError::MissingAlgorithm(input.to_string()))?;

        if algorithm.is_empty() {
            return Err(DigestError::MissingAlgorithm(input.to_string()));
        }

        // algorithm: [a-z0-9]+ with '+', '.', '_', '-' separators
        for c in algorithm.chars() {
            if !c.is_ascii_lowercase()
                && !c.is_ascii_digit()
                && c != '+'
                && c != '.'
                && c != '_'
                && c != '-'
            {
                return Err(DigestError::InvalidAlgorithmChar(c));
            }
        }

        if encoded.is_empty() {
            return Err(DigestError::EmptyEncoded(input.to_string()));
        }

        for c in encoded.chars() {
            if !c.is_ascii_alphanumeric() && c != '=' && c != '_' && c != '-' {
                return Err(DigestError::InvalidChar(c));
            }
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(a, _)| a).unwrap_or_default()
    }

    /// Leading characters of the digest, for compact operator output.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
