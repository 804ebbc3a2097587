// ABOUTME: Deletion request and result types shared by registry adapters.
// ABOUTME: ImageIdentifier, DeletionResult, DeletionFailure, and FailureCode.

use crate::types::{Digest, Image};
use serde::Serialize;
use std::fmt;

/// Identifies an image to delete. Deleting by digest removes every tag
/// pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageIdentifier {
    pub digest: Digest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ImageIdentifier {
    pub fn digest(digest: Digest) -> Self {
        Self { digest, tag: None }
    }
}

impl From<&Image> for ImageIdentifier {
    fn from(image: &Image) -> Self {
        Self::digest(image.digest().clone())
    }
}

impl fmt::Display for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Some(ref tag) => write!(f, "{} ({})", self.digest, tag),
            None => write!(f, "{}", self.digest),
        }
    }
}

/// Why the registry refused to delete a single image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureCode {
    /// The image is already gone.
    ImageNotFound,
    /// The image is still referenced (e.g. by a manifest list).
    ImageReferenced,
    /// The registry does not allow manifest deletion.
    DeletionUnsupported,
    /// The registry rejected the digest format.
    InvalidDigest,
    /// The whole batch kept failing after retries.
    BatchFailed,
    /// Any other registry-reported code.
    Registry(String),
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCode::ImageNotFound => write!(f, "ImageNotFound"),
            FailureCode::ImageReferenced => write!(f, "ImageReferenced"),
            FailureCode::DeletionUnsupported => write!(f, "DeletionUnsupported"),
            FailureCode::InvalidDigest => write!(f, "InvalidDigest"),
            FailureCode::BatchFailed => write!(f, "BatchFailed"),
            FailureCode::Registry(code) => write!(f, "{code}"),
        }
    }
}

/// A per-image deletion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub id: ImageIdentifier,
    pub code: FailureCode,
    pub reason: String,
}

/// Outcome of one or more batch deletions, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionResult {
    pub deletions: Vec<ImageIdentifier>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionResult {
    pub fn deleted(&mut self, id: ImageIdentifier) {
        self.deletions.push(id);
    }

    pub fn failed(&mut self, id: ImageIdentifier, code: FailureCode, reason: impl Into<String>) {
        self.failures.push(DeletionFailure {
            id,
            code,
            reason: reason.into(),
        });
    }

    /// Append another result, preserving order.
    pub fn merge(&mut self, other: DeletionResult) {
        self.deletions.extend(other.deletions);
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.failures.is_empty()
    }

    /// Whether `id` was either deleted or rejected.
    pub fn resolves(&self, id: &ImageIdentifier) -> bool {
        self.deletions.contains(id) || self.failures.iter().any(|f| &f.id == id)
    }
}
