// ABOUTME: Collector error types with SNAFU pattern.
// ABOUTME: Unifies catalog and batch failures for programmatic handling.

use snafu::Snafu;

use crate::registry::{BatchError, CatalogError};
use crate::types::RepositoryName;

/// Unified error for a garbage-collection pass.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GcError {
    #[snafu(display("failed to list repositories: {source}"))]
    ListRepositories { source: CatalogError },

    #[snafu(display("failed to list images in {repository}: {source}"))]
    ListImages {
        repository: RepositoryName,
        source: CatalogError,
    },

    #[snafu(display(
        "batch {batch} in {repository} failed after {attempts} attempt(s): {source}"
    ))]
    Batch {
        repository: RepositoryName,
        batch: usize,
        attempts: u32,
        source: BatchError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcErrorKind {
    /// The repository catalog could not be listed.
    CatalogUnavailable,
    /// One repository's images could not be listed.
    RepositoryUnavailable,
    /// The registry rejected or could not obtain credentials.
    Unauthorized,
    /// A deletion batch failed as a whole.
    BatchFailed,
}

impl GcError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> GcErrorKind {
        match self {
            GcError::ListRepositories { source } => match source {
                CatalogError::Unauthorized(_) | CatalogError::Credentials(_) => {
                    GcErrorKind::Unauthorized
                }
                _ => GcErrorKind::CatalogUnavailable,
            },
            GcError::ListImages { source, .. } => match source {
                CatalogError::Unauthorized(_) | CatalogError::Credentials(_) => {
                    GcErrorKind::Unauthorized
                }
                _ => GcErrorKind::RepositoryUnavailable,
            },
            GcError::Batch { source, .. } => match source {
                BatchError::Unauthorized(_) | BatchError::Credentials(_) => {
                    GcErrorKind::Unauthorized
                }
                BatchError::Transport(_) | BatchError::Rejected(_) => GcErrorKind::BatchFailed,
            },
        }
    }

    /// Repository the error belongs to, if any.
    pub fn repository(&self) -> Option<&RepositoryName> {
        match self {
            GcError::ListRepositories { .. } => None,
            GcError::ListImages { repository, .. } | GcError::Batch { repository, .. } => {
                Some(repository)
            }
        }
    }
}
