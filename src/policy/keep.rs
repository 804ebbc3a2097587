// ABOUTME: Per-prefix keep-count rules ("release=4") and their validated collection.
// ABOUTME: Parses rules from CLI flags and deserializes them from config maps.

use super::error::PolicyError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single `prefix=count` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepRule {
    pub prefix: String,
    pub count: u32,
}

impl FromStr for KeepRule {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, count) = s
            .split_once('=')
            .ok_or_else(|| PolicyError::MalformedRule(s.to_string()))?;

        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(PolicyError::EmptyPrefix);
        }

        let count = count.trim();
        let count = match count.parse::<i64>() {
            Ok(n) if n < 0 => {
                return Err(PolicyError::NegativeCount {
                    prefix: prefix.to_string(),
                    count: n,
                });
            }
            Ok(n) => u32::try_from(n).ok(),
            Err(_) => None,
        }
        .ok_or_else(|| PolicyError::InvalidCount {
            prefix: prefix.to_string(),
            value: count.to_string(),
        })?;

        Ok(Self {
            prefix: prefix.to_string(),
            count,
        })
    }
}

impl fmt::Display for KeepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.prefix, self.count)
    }
}

/// Mapping from tag prefix to how many of the most recent matching images to keep.
///
/// Iteration is in prefix order so repeated evaluations see the rules in the
/// same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, i64>")]
pub struct KeepCounts(BTreeMap<String, u32>);

impl KeepCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for a prefix, replacing any previous value.
    pub fn insert(&mut self, prefix: impl Into<String>, count: u32) {
        self.0.insert(prefix.into(), count);
    }

    pub fn get(&self, prefix: &str) -> Option<u32> {
        self.0.get(prefix).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(p, c)| (p.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<KeepRule> for KeepCounts {
    fn extend<I: IntoIterator<Item = KeepRule>>(&mut self, rules: I) {
        for rule in rules {
            self.insert(rule.prefix, rule.count);
        }
    }
}

impl FromIterator<KeepRule> for KeepCounts {
    fn from_iter<I: IntoIterator<Item = KeepRule>>(rules: I) -> Self {
        let mut counts = Self::new();
        counts.extend(rules);
        counts
    }
}

impl TryFrom<BTreeMap<String, i64>> for KeepCounts {
    type Error = PolicyError;

    fn try_from(raw: BTreeMap<String, i64>) -> Result<Self, Self::Error> {
        let mut counts = Self::new();
        for (prefix, count) in raw {
            if prefix.trim().is_empty() {
                return Err(PolicyError::EmptyPrefix);
            }
            let count = u32::try_from(count).map_err(|_| {
                if count < 0 {
                    PolicyError::NegativeCount {
                        prefix: prefix.clone(),
                        count,
                    }
                } else {
                    PolicyError::InvalidCount {
                        prefix: prefix.clone(),
                        value: count.to_string(),
                    }
                }
            })?;
            counts.insert(prefix, count);
        }
        Ok(counts)
    }
}

impl fmt::Display for KeepCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.iter().map(|(p, c)| format!("{p}={c}")).collect();
        write!(f, "{{{}}}", rules.join(", "))
    }
}
