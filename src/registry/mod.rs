// ABOUTME: Registry capability traits and adapters.
// ABOUTME: Catalog reads images, ImageDeleter removes them in batches.

mod client;
mod credentials;
mod ecr;
mod error;
mod http;
mod memory;
mod types;

pub use credentials::{CredentialError, CredentialProvider, Credentials, StaticCredentials};
pub use error::{BatchError, BatchFailure, CatalogError};
pub use client::RegistryClient;
pub use ecr::{EcrRegistry, EcrSettings, SdkCredentials};
pub use http::HttpRegistry;
pub use memory::InMemoryRegistry;
pub use types::{DeletionFailure, DeletionResult, FailureCode, ImageIdentifier};

use crate::types::{Image, RepositoryName};
use async_trait::async_trait;

/// Largest batch a registry accepts in one deletion call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Read access to repositories and their images.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// List every repository in the registry.
    async fn repositories(&self) -> Result<Vec<RepositoryName>, CatalogError>;

    /// List the images of one repository.
    async fn images(&self, repository: &RepositoryName) -> Result<Vec<Image>, CatalogError>;

    /// Number of image references in a repository.
    async fn image_count(&self, repository: &RepositoryName) -> Result<usize, CatalogError> {
        self.images(repository).await.map(|images| images.len())
    }
}

/// Batch deletion of images by identifier.
#[async_trait]
pub trait ImageDeleter: Send + Sync {
    /// Upper bound on identifiers per [`batch_delete`](ImageDeleter::batch_delete) call.
    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    /// Delete a batch. Per-item rejections land in the result; `Err` means the
    /// batch stopped early, with whatever was resolved before that in
    /// [`BatchFailure::completed`].
    async fn batch_delete(
        &self,
        repository: &RepositoryName,
        ids: &[ImageIdentifier],
    ) -> Result<DeletionResult, BatchFailure>;
}

/// Full registry access. Automatically implemented for any type that
/// implements both capability traits.
pub trait Registry: Catalog + ImageDeleter {}

impl<T: Catalog + ImageDeleter + ?Sized> Registry for T {}
