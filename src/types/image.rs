// ABOUTME: Image record as fetched from a registry catalog.
// ABOUTME: Immutable once built; read-only input to the retention engine.

use super::digest::Digest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A single image in a repository, identified by its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    digest: Digest,
    tags: BTreeSet<String>,
    pushed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl Image {
    pub fn new<I, T>(digest: Digest, tags: I, pushed_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            digest,
            tags: tags.into_iter().map(Into::into).collect(),
            pushed_at,
            size: None,
        }
    }

    /// Attach the image size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn pushed_at(&self) -> DateTime<Utc> {
        self.pushed_at
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether at least one tag starts with `prefix`.
    pub fn has_tag_prefix(&self, prefix: &str) -> bool {
        self.tags.iter().any(|t| t.starts_with(prefix))
    }

    /// Oldest first, digest ascending on equal push times.
    pub fn cmp_oldest_first(&self, other: &Self) -> Ordering {
        self.pushed_at
            .cmp(&other.pushed_at)
            .then_with(|| self.digest.cmp(&other.digest))
    }

    /// Newest first, digest ascending on equal push times.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        other
            .pushed_at
            .cmp(&self.pushed_at)
            .then_with(|| self.digest.cmp(&other.digest))
    }
}
