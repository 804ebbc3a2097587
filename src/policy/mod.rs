// ABOUTME: Retention policy engine deciding which images to delete.
// ABOUTME: Reconciles untagged deletion, per-prefix keep windows, and a global cap.

mod error;
mod keep;

pub use error::PolicyError;
pub use keep::{KeepCounts, KeepRule};

use crate::types::{Digest, Image};
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// Retention rules applied to each repository.
///
/// With no rules configured the engine deletes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetentionPolicy {
    /// Delete every image that has no tags.
    #[serde(default)]
    pub delete_untagged: bool,

    /// Keep the N most recently pushed images per tag prefix.
    #[serde(default)]
    pub keep: KeepCounts,

    /// Maximum number of images per repository.
    #[serde(default)]
    pub max_images: Option<NonZeroUsize>,
}

impl RetentionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delete_untagged(mut self, enabled: bool) -> Self {
        self.delete_untagged = enabled;
        self
    }

    pub fn with_keep(mut self, prefix: impl Into<String>, count: u32) -> Self {
        self.keep.insert(prefix, count);
        self
    }

    pub fn with_max_images(mut self, cap: NonZeroUsize) -> Self {
        self.max_images = Some(cap);
        self
    }

    /// Whether any rule is configured.
    pub fn is_empty(&self) -> bool {
        !self.delete_untagged && self.keep.is_empty() && self.max_images.is_none()
    }
}

/// Compute the images to delete from `images` under `policy`.
///
/// Untagged images are candidates when `delete_untagged` is set. For each
/// keep rule, the `count` newest images carrying a tag with that prefix are
/// protected and older matches become candidates. When the repository holds
/// more than `max_images`, the oldest unprotected images covering the excess
/// become candidates. Protection always wins over candidacy.
///
/// The result is ordered oldest first, digest ascending on equal push times,
/// and contains each digest at most once.
pub fn compute_deletion_set<'a>(images: &'a [Image], policy: &RetentionPolicy) -> Vec<&'a Image> {
    let mut protected: HashSet<&Digest> = HashSet::new();
    let mut candidates: HashSet<&Digest> = HashSet::new();

    let (untagged, tagged): (Vec<&Image>, Vec<&Image>) =
        images.iter().partition(|image| image.is_untagged());

    if policy.delete_untagged {
        candidates.extend(untagged.iter().map(|image| image.digest()));
    }

    for (prefix, count) in policy.keep.iter() {
        let mut matching: Vec<&Image> = tagged
            .iter()
            .copied()
            .filter(|image| image.has_tag_prefix(prefix))
            .collect();
        matching.sort_by(|a, b| a.cmp_newest_first(b));

        let window = (count as usize).min(matching.len());
        let (kept, expired) = matching.split_at(window);
        protected.extend(kept.iter().map(|image| image.digest()));
        candidates.extend(expired.iter().map(|image| image.digest()));
    }

    if let Some(cap) = policy.max_images {
        let excess = images.len().saturating_sub(cap.get());
        if excess > 0 {
            let mut pool: Vec<&Image> = images
                .iter()
                .filter(|image| !protected.contains(image.digest()))
                .collect();
            pool.sort_by(|a, b| a.cmp_oldest_first(b));
            candidates.extend(pool.into_iter().take(excess).map(Image::digest));
        }
    }

    let mut seen: HashSet<&Digest> = HashSet::new();
    let mut deletions: Vec<&Image> = images
        .iter()
        .filter(|image| {
            let digest = image.digest();
            candidates.contains(digest) && !protected.contains(digest) && seen.insert(digest)
        })
        .collect();
    deletions.sort_by(|a, b| a.cmp_oldest_first(b));

    tracing::debug!(
        evaluated = images.len(),
        protected = protected.len(),
        marked = deletions.len(),
        "Evaluated retention policy"
    );

    deletions
}
