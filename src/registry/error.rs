// ABOUTME: Error types for catalog reads and batch deletions.
// ABOUTME: Batch errors are whole-batch failures, distinct from per-item failures.

use super::credentials::CredentialError;
use super::types::DeletionResult;

/// Listing repositories or images failed.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid registry endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("registry rejected credentials: {0}")]
    Unauthorized(String),

    #[error("registry returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("registry error: {0}")]
    Service(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::InvalidResponse(err.to_string())
        } else {
            CatalogError::Transport(err.to_string())
        }
    }
}

/// An entire batch deletion call failed before per-item results were known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("registry rejected credentials: {0}")]
    Unauthorized(String),

    #[error("registry rejected batch: {0}")]
    Rejected(String),

    #[error("credentials unavailable: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for BatchError {
    fn from(err: reqwest::Error) -> Self {
        BatchError::Transport(err.to_string())
    }
}

impl From<CredentialError> for BatchError {
    fn from(err: CredentialError) -> Self {
        BatchError::Credentials(err.to_string())
    }
}

/// A batch that stopped early. Items resolved before the error are kept in
/// `completed`; every other identifier of the batch is unresolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct BatchFailure {
    pub error: BatchError,
    pub completed: DeletionResult,
}

impl BatchFailure {
    /// A failure after `completed` items were already resolved.
    pub fn partial(error: BatchError, completed: DeletionResult) -> Self {
        Self { error, completed }
    }
}

impl From<BatchError> for BatchFailure {
    fn from(error: BatchError) -> Self {
        Self {
            error,
            completed: DeletionResult::default(),
        }
    }
}
