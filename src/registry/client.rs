// ABOUTME: Registry client selected from configuration.
// ABOUTME: Dispatches catalog and deletion calls to the HTTP or ECR adapter.

use super::ecr::{EcrRegistry, EcrSettings};
use super::error::{BatchFailure, CatalogError};
use super::http::HttpRegistry;
use super::types::{DeletionResult, ImageIdentifier};
use super::{Catalog, CredentialProvider, ImageDeleter};
use crate::config::{RegistryConfig, RegistryKind};
use crate::types::{Image, RepositoryName};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub enum RegistryClient {
    Http(HttpRegistry),
    Ecr(EcrRegistry),
}

impl RegistryClient {
    /// Build the adapter named by `config.kind`.
    pub async fn from_config(config: &RegistryConfig) -> Result<Self, CatalogError> {
        let credentials: Option<Arc<dyn CredentialProvider>> = config
            .credentials()
            .map(|creds| Arc::new(creds) as Arc<dyn CredentialProvider>);

        match config.kind {
            RegistryKind::Http => {
                let mut registry = HttpRegistry::new(&config.url, config.timeout)?
                    .with_page_size(config.page_size);
                if let Some(credentials) = credentials {
                    registry = registry.with_credentials(credentials);
                }
                Ok(RegistryClient::Http(registry))
            }
            RegistryKind::Ecr => {
                let settings = EcrSettings {
                    region: config.region.clone(),
                    registry_id: config.registry_id.clone(),
                    endpoint: Some(config.url.clone()).filter(|url| !url.trim().is_empty()),
                    timeout: Some(config.timeout),
                };
                Ok(RegistryClient::Ecr(
                    EcrRegistry::connect(settings, credentials).await,
                ))
            }
        }
    }

    /// Where requests go, for progress messages.
    pub fn describe(&self) -> String {
        match self {
            RegistryClient::Http(registry) => registry.base_url().to_string(),
            RegistryClient::Ecr(registry) => registry.describe(),
        }
    }
}

#[async_trait]
impl Catalog for RegistryClient {
    async fn repositories(&self) -> Result<Vec<RepositoryName>, CatalogError> {
        match self {
            RegistryClient::Http(registry) => registry.repositories().await,
            RegistryClient::Ecr(registry) => registry.repositories().await,
        }
    }

    async fn images(&self, repository: &RepositoryName) -> Result<Vec<Image>, CatalogError> {
        match self {
            RegistryClient::Http(registry) => registry.images(repository).await,
            RegistryClient::Ecr(registry) => registry.images(repository).await,
        }
    }

    async fn image_count(&self, repository: &RepositoryName) -> Result<usize, CatalogError> {
        match self {
            RegistryClient::Http(registry) => registry.image_count(repository).await,
            RegistryClient::Ecr(registry) => registry.image_count(repository).await,
        }
    }
}

#[async_trait]
impl ImageDeleter for RegistryClient {
    fn max_batch_size(&self) -> usize {
        match self {
            RegistryClient::Http(registry) => registry.max_batch_size(),
            RegistryClient::Ecr(registry) => registry.max_batch_size(),
        }
    }

    async fn batch_delete(
        &self,
        repository: &RepositoryName,
        ids: &[ImageIdentifier],
    ) -> Result<DeletionResult, BatchFailure> {
        match self {
            RegistryClient::Http(registry) => registry.batch_delete(repository, ids).await,
            RegistryClient::Ecr(registry) => registry.batch_delete(repository, ids).await,
        }
    }
}
