// ABOUTME: Validated repository name as used in registry API paths.
// ABOUTME: Lowercase path components separated by '/', as OCI distribution names require.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum RepositoryNameError {
    #[error("repository name cannot be empty")]
    Empty,

    #[error("repository name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("repository name must be lowercase")]
    NotLowercase,

    #[error("invalid character in repository name: '{0}'")]
    InvalidChar(char),

    #[error("invalid path component in repository name: '{0}'")]
    InvalidComponent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn new(value: &str) -> Result<Self, RepositoryNameError> {
        if value.is_empty() {
            return Err(RepositoryNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(RepositoryNameError::TooLong);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(RepositoryNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase()
                && !c.is_ascii_digit()
                && c != '/'
                && c != '.'
                && c != '_'
                && c != '-'
            {
                return Err(RepositoryNameError::InvalidChar(c));
            }
        }

        // Each component must start and end with an alphanumeric.
        for component in value.split('/') {
            let valid = component
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric())
                && component
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_ascii_alphanumeric());
            if !valid {
                return Err(RepositoryNameError::InvalidComponent(component.to_string()));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RepositoryName {
    type Err = RepositoryNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for RepositoryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RepositoryName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(&value).map_err(serde::de::Error::custom)
    }
}
