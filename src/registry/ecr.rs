// ABOUTME: Registry adapter for Amazon ECR through the AWS SDK.
// ABOUTME: Lists images with push times, including untagged ones, and deletes via BatchDeleteImage.

use super::credentials::CredentialProvider;
use super::error::{BatchError, BatchFailure, CatalogError};
use super::types::{DeletionResult, FailureCode, ImageIdentifier};
use super::{Catalog, ImageDeleter, MAX_BATCH_SIZE};
use crate::types::{Digest, Image, RepositoryName};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, ProvideCredentials};
use aws_sdk_ecr::config::Region;
use aws_sdk_ecr::config::http::HttpResponse;
use aws_sdk_ecr::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ecr::types::{ImageDetail, ImageFailure};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error codes ECR uses for missing, invalid, or insufficient credentials.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "ExpiredTokenException",
    "InvalidClientTokenId",
];
const REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";
const CREDENTIALS_SOURCE: &str = "registry-gc";

/// Where and how to reach ECR. Unset fields fall back to the AWS
/// environment (`AWS_REGION`, profiles, instance metadata).
#[derive(Debug, Clone, Default)]
pub struct EcrSettings {
    pub region: Option<String>,
    /// Account that owns the registry. Defaults to the caller's account.
    pub registry_id: Option<String>,
    /// Endpoint override, e.g. a VPC endpoint.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

/// Amazon ECR client scoped to one registry.
pub struct EcrRegistry {
    client: aws_sdk_ecr::Client,
    registry_id: Option<String>,
}

impl fmt::Debug for EcrRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcrRegistry")
            .field("region", &self.region())
            .field("registry_id", &self.registry_id)
            .finish()
    }
}

impl EcrRegistry {
    /// Build a client from `settings` and the AWS configuration chain.
    /// `credentials`, when given, replace the chain's credential lookup.
    pub async fn connect(
        settings: EcrSettings,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = settings.region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = settings.timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(timeout)
                    .build(),
            );
        }
        if let Some(provider) = credentials {
            loader = loader.credentials_provider(SdkCredentials::new(provider));
        }

        let sdk_config = loader.load().await;
        let registry = Self::from_client(aws_sdk_ecr::Client::new(&sdk_config));
        match settings.registry_id {
            Some(id) => registry.with_registry_id(id),
            None => registry,
        }
    }

    pub fn from_client(client: aws_sdk_ecr::Client) -> Self {
        Self {
            client,
            registry_id: None,
        }
    }

    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    pub fn region(&self) -> Option<String> {
        self.client.config().region().map(|r| r.to_string())
    }

    /// Human-readable registry location for progress messages.
    pub fn describe(&self) -> String {
        let region = self.region().unwrap_or_else(|| "default region".to_string());
        match &self.registry_id {
            Some(id) => format!("ECR {id} ({region})"),
            None => format!("ECR ({region})"),
        }
    }
}

#[async_trait]
impl Catalog for EcrRegistry {
    async fn repositories(&self) -> Result<Vec<RepositoryName>, CatalogError> {
        let mut pages = self
            .client
            .describe_repositories()
            .set_registry_id(self.registry_id.clone())
            .into_paginator()
            .items()
            .send();

        let mut names = Vec::new();
        while let Some(repository) = pages.next().await {
            let repository = repository.map_err(catalog_error)?;
            let Some(name) = repository.repository_name else {
                continue;
            };
            match RepositoryName::new(&name) {
                Ok(repository) => names.push(repository),
                Err(e) => {
                    tracing::warn!(
                        repository = %name,
                        error = %e,
                        "Skipping repository with invalid name"
                    );
                }
            }
        }

        Ok(names)
    }

    async fn images(&self, repository: &RepositoryName) -> Result<Vec<Image>, CatalogError> {
        let mut pages = self
            .client
            .describe_images()
            .repository_name(repository.as_str())
            .set_registry_id(self.registry_id.clone())
            .into_paginator()
            .items()
            .send();

        let mut images = Vec::new();
        while let Some(detail) = pages.next().await {
            let detail = detail.map_err(|e| repository_error(repository, e))?;
            match image_from_detail(detail) {
                Ok(image) => images.push(image),
                Err(reason) => tracing::warn!(%repository, reason, "Skipping image"),
            }
        }

        Ok(images)
    }

    async fn image_count(&self, repository: &RepositoryName) -> Result<usize, CatalogError> {
        let mut pages = self
            .client
            .list_images()
            .repository_name(repository.as_str())
            .set_registry_id(self.registry_id.clone())
            .into_paginator()
            .items()
            .send();

        let mut count = 0;
        while let Some(id) = pages.next().await {
            id.map_err(|e| repository_error(repository, e))?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl ImageDeleter for EcrRegistry {
    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    async fn batch_delete(
        &self,
        repository: &RepositoryName,
        ids: &[ImageIdentifier],
    ) -> Result<DeletionResult, BatchFailure> {
        let image_ids = ids
            .iter()
            .map(|id| {
                aws_sdk_ecr::types::ImageIdentifier::builder()
                    .image_digest(id.digest.as_str())
                    .build()
            })
            .collect();

        let output = self
            .client
            .batch_delete_image()
            .repository_name(repository.as_str())
            .set_registry_id(self.registry_id.clone())
            .set_image_ids(Some(image_ids))
            .send()
            .await
            .map_err(batch_error)?;

        let mut result = DeletionResult::default();
        // One entry per removed tag, so a digest can appear several times.
        for deleted in output.image_ids.unwrap_or_default() {
            match deleted.image_digest.as_deref().map(Digest::parse) {
                Some(Ok(digest)) => {
                    let id = ImageIdentifier::digest(digest);
                    if !result.deletions.contains(&id) {
                        result.deleted(id);
                    }
                }
                _ => tracing::warn!(%repository, "Deleted image without a valid digest"),
            }
        }
        for failure in output.failures.unwrap_or_default() {
            let Some((id, code, reason)) = item_failure(failure) else {
                tracing::warn!(%repository, "Deletion failure without a valid digest");
                continue;
            };
            result.failed(id, code, reason);
        }

        order_by_submission(&mut result, ids);
        Ok(result)
    }
}

/// Adapts a [`CredentialProvider`] to the AWS SDK credential chain. The SDK
/// caches what it returns and asks again when its cache expires.
pub struct SdkCredentials {
    provider: Arc<dyn CredentialProvider>,
}

impl SdkCredentials {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for SdkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCredentials").finish_non_exhaustive()
    }
}

impl ProvideCredentials for SdkCredentials {
    fn provide_credentials<'a>(&'a self) -> provider::future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        provider::future::ProvideCredentials::new(async move {
            let creds = self
                .provider
                .fetch()
                .await
                .map_err(CredentialsError::provider_error)?;
            Ok(aws_credential_types::Credentials::new(
                creds.access_key,
                creds.secret_key,
                None,
                None,
                CREDENTIALS_SOURCE,
            ))
        })
    }
}

fn image_from_detail(detail: ImageDetail) -> Result<Image, String> {
    let digest = detail
        .image_digest
        .ok_or_else(|| "missing image digest".to_string())?;
    let digest = Digest::parse(&digest).map_err(|e| e.to_string())?;
    let pushed_at = detail
        .image_pushed_at
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let image = Image::new(digest, detail.image_tags.unwrap_or_default(), pushed_at);
    Ok(
        match detail
            .image_size_in_bytes
            .and_then(|size| u64::try_from(size).ok())
        {
            Some(size) => image.with_size(size),
            None => image,
        },
    )
}

fn item_failure(failure: ImageFailure) -> Option<(ImageIdentifier, FailureCode, String)> {
    let digest = failure.image_id?.image_digest?;
    let digest = Digest::parse(&digest).ok()?;
    let code = match failure.failure_code.as_ref().map(|code| code.as_str()) {
        Some("ImageNotFound") => FailureCode::ImageNotFound,
        Some("ImageReferencedByManifestList") => FailureCode::ImageReferenced,
        Some("InvalidImageDigest") => FailureCode::InvalidDigest,
        Some(other) => FailureCode::Registry(other.to_string()),
        None => FailureCode::Registry("Unknown".to_string()),
    };
    Some((
        ImageIdentifier::digest(digest),
        code,
        failure.failure_reason.unwrap_or_default(),
    ))
}

/// ECR does not promise response order; restore the order ids were sent in.
fn order_by_submission(result: &mut DeletionResult, ids: &[ImageIdentifier]) {
    let position: HashMap<&Digest, usize> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (&id.digest, index))
        .collect();
    let rank = |id: &ImageIdentifier| position.get(&id.digest).copied().unwrap_or(usize::MAX);
    result.deletions.sort_by_key(|id| rank(id));
    result.failures.sort_by_key(|failure| rank(&failure.id));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    Unauthorized,
    RepositoryNotFound,
    Service,
    Transport,
}

fn classify<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> ErrorClass {
    if err.as_service_error().is_none() {
        return ErrorClass::Transport;
    }
    let status = err.raw_response().map(|r| r.status().as_u16());
    match err.code() {
        Some(code) if AUTH_ERROR_CODES.contains(&code) => ErrorClass::Unauthorized,
        Some(REPOSITORY_NOT_FOUND) => ErrorClass::RepositoryNotFound,
        _ if matches!(status, Some(401 | 403)) => ErrorClass::Unauthorized,
        _ => ErrorClass::Service,
    }
}

fn catalog_error<E>(err: SdkError<E, HttpResponse>) -> CatalogError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match classify(&err) {
        ErrorClass::Unauthorized => CatalogError::Unauthorized(message),
        ErrorClass::RepositoryNotFound => CatalogError::NotFound(message),
        ErrorClass::Service => CatalogError::Service(message),
        ErrorClass::Transport => CatalogError::Transport(message),
    }
}

fn repository_error<E>(repository: &RepositoryName, err: SdkError<E, HttpResponse>) -> CatalogError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match classify(&err) {
        ErrorClass::RepositoryNotFound => CatalogError::RepositoryNotFound(repository.to_string()),
        _ => catalog_error(err),
    }
}

fn batch_error<E>(err: SdkError<E, HttpResponse>) -> BatchError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match classify(&err) {
        ErrorClass::Unauthorized => BatchError::Unauthorized(message),
        ErrorClass::RepositoryNotFound | ErrorClass::Service => BatchError::Rejected(message),
        ErrorClass::Transport => BatchError::Transport(message),
    }
}
