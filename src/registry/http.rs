// ABOUTME: Registry adapter for the OCI distribution (Docker Registry v2) HTTP API.
// ABOUTME: Lists repositories and tags, resolves manifests to images, deletes by digest.

use super::credentials::{CredentialError, CredentialProvider, Credentials};
use super::error::{BatchError, BatchFailure, CatalogError};
use super::types::{DeletionResult, FailureCode, ImageIdentifier};
use super::{Catalog, ImageDeleter};
use crate::types::{Digest, Image, RepositoryName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
    application/vnd.docker.distribution.manifest.v2+json, \
    application/vnd.oci.image.index.v1+json, \
    application/vnd.docker.distribution.manifest.list.v2+json";
const CONTENT_DIGEST: &str = "Docker-Content-Digest";
const CREATED_ANNOTATION: &str = "org.opencontainers.image.created";
const DEFAULT_PAGE_SIZE: usize = 100;
const TAG_FETCH_CONCURRENCY: usize = 8;

/// HTTP client for a single registry endpoint.
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<Arc<dyn CredentialProvider>>,
    cached: RwLock<Option<Credentials>>,
    page_size: usize,
}

impl std::fmt::Debug for HttpRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistry")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl HttpRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let mut url =
            Url::parse(base_url).map_err(|e| CatalogError::InvalidEndpoint(e.to_string()))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("registry-gc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::InvalidEndpoint(e.to_string()))?;

        Ok(Self {
            client,
            base_url: url,
            credentials: None,
            cached: RwLock::new(None),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Authenticate requests with credentials from `provider`.
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Number of repositories requested per catalog page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(path)
            .map_err(|e| CatalogError::InvalidEndpoint(e.to_string()))
    }

    /// Current credentials, refetched when the provider reports expiry.
    async fn credentials(&self) -> Result<Option<Credentials>, CredentialError> {
        let Some(provider) = &self.credentials else {
            return Ok(None);
        };

        if !provider.is_expired() {
            let cached = self.cached.read().clone();
            if cached.is_some() {
                return Ok(cached);
            }
        }

        let fresh = provider.fetch().await?;
        *self.cached.write() = Some(fresh.clone());
        Ok(Some(fresh))
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, CredentialError> {
        Ok(match self.credentials().await? {
            Some(creds) => request.basic_auth(creds.access_key, Some(creds.secret_key)),
            None => request,
        })
    }

    async fn get(&self, url: Url, accept: Option<&str>) -> Result<Response, CatalogError> {
        let mut request = self.client.get(url.clone());
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = self.authorized(request).await?.send().await?;
        check_status(response, &url)
    }

    async fn tags(&self, repository: &RepositoryName) -> Result<Vec<String>, CatalogError> {
        let url = self.url(&format!("v2/{repository}/tags/list"))?;
        let list: TagList = match self.get(url, None).await {
            Ok(response) => response.json().await?,
            Err(CatalogError::NotFound(_)) => {
                return Err(CatalogError::RepositoryNotFound(repository.to_string()));
            }
            Err(e) => return Err(e),
        };
        Ok(list.tags.unwrap_or_default())
    }

    /// Resolve one tag to its manifest digest, push time, and size.
    /// Returns `None` when the tag disappeared between listing and lookup.
    async fn manifest_summary(
        &self,
        repository: &RepositoryName,
        tag: &str,
    ) -> Result<Option<ManifestSummary>, CatalogError> {
        let url = self.url(&format!("v2/{repository}/manifests/{tag}"))?;
        let response = match self.get(url, Some(MANIFEST_ACCEPT)).await {
            Ok(response) => response,
            Err(CatalogError::NotFound(_)) => {
                tracing::debug!(%repository, tag, "Tag vanished before manifest lookup");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let digest = response
            .headers()
            .get(CONTENT_DIGEST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                CatalogError::InvalidResponse(format!(
                    "missing {CONTENT_DIGEST} header for {repository}:{tag}"
                ))
            })?;
        let digest =
            Digest::parse(digest).map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

        let manifest: Manifest = response.json().await?;

        let (pushed_at, size) = match manifest.config {
            Some(ref config) => {
                let created = self.config_created(repository, &config.digest).await?;
                let layers: u64 = manifest.layers.iter().map(|l| l.size).sum();
                (created, Some(config.size + layers))
            }
            None => {
                let created = manifest
                    .annotations
                    .get(CREATED_ANNOTATION)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|d| d.with_timezone(&Utc));
                let size: u64 = manifest.manifests.iter().map(|m| m.size).sum();
                (created, Some(size))
            }
        };

        if pushed_at.is_none() {
            tracing::debug!(%repository, tag, "No creation time recorded, treating as oldest");
        }

        Ok(Some(ManifestSummary {
            digest,
            pushed_at: pushed_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            size,
        }))
    }

    /// Creation time from an image config blob. A missing blob means unknown.
    async fn config_created(
        &self,
        repository: &RepositoryName,
        digest: &str,
    ) -> Result<Option<DateTime<Utc>>, CatalogError> {
        let url = self.url(&format!("v2/{repository}/blobs/{digest}"))?;
        let response = match self.get(url, None).await {
            Ok(response) => response,
            Err(CatalogError::NotFound(_)) => {
                tracing::debug!(%repository, config = digest, "Config blob missing");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let config: ImageConfig = response.json().await?;
        Ok(config.created)
    }

    /// Delete one manifest. `Ok(Some(_))` is a per-item rejection, `Err` stops
    /// the batch.
    async fn delete_manifest(
        &self,
        repository: &RepositoryName,
        id: &ImageIdentifier,
    ) -> Result<Option<(FailureCode, String)>, BatchError> {
        let url = self
            .base_url
            .join(&format!("v2/{repository}/manifests/{}", id.digest))
            .map_err(|e| BatchError::Transport(e.to_string()))?;
        let response = self.authorized(self.client.delete(url)).await?.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BatchError::Unauthorized(format!(
                "HTTP {} deleting from {repository}",
                status.as_u16()
            )));
        }

        let (registry_code, message) = error_details(response).await;
        let code = match status {
            StatusCode::NOT_FOUND => FailureCode::ImageNotFound,
            StatusCode::METHOD_NOT_ALLOWED => FailureCode::DeletionUnsupported,
            StatusCode::CONFLICT => FailureCode::ImageReferenced,
            StatusCode::BAD_REQUEST => FailureCode::InvalidDigest,
            other => FailureCode::Registry(
                registry_code.unwrap_or_else(|| format!("HTTP{}", other.as_u16())),
            ),
        };
        Ok(Some((code, message)))
    }
}

#[async_trait]
impl Catalog for HttpRegistry {
    async fn repositories(&self) -> Result<Vec<RepositoryName>, CatalogError> {
        let mut next = Some(self.url(&format!("v2/_catalog?n={}", self.page_size))?);
        let mut names = Vec::new();

        while let Some(url) = next.take() {
            let response = self.get(url, None).await?;
            next = next_page(response.headers(), &self.base_url)?;
            let page: CatalogPage = response.json().await?;

            for name in page.repositories {
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
        }

        Ok(names)
    }

    async fn images(&self, repository: &RepositoryName) -> Result<Vec<Image>, CatalogError> {
        let tags = self.tags(repository).await?;

        let summaries: Vec<Result<Option<(String, ManifestSummary)>, CatalogError>> =
            stream::iter(tags)
                .map(|tag| async move {
                    self.manifest_summary(repository, &tag)
                        .await
                        .map(|summary| summary.map(|s| (tag, s)))
                })
                .buffered(TAG_FETCH_CONCURRENCY)
                .collect()
                .await;

        // Several tags may point at one digest.
        let mut grouped: BTreeMap<Digest, (Vec<String>, ManifestSummary)> = BTreeMap::new();
        for entry in summaries {
            let Some((tag, summary)) = entry? else {
                continue;
            };
            grouped
                .entry(summary.digest.clone())
                .or_insert_with(|| (Vec::new(), summary))
                .0
                .push(tag);
        }

        Ok(grouped
            .into_values()
            .map(|(tags, summary)| {
                let image = Image::new(summary.digest, tags, summary.pushed_at);
                match summary.size {
                    Some(size) => image.with_size(size),
                    None => image,
                }
            })
            .collect())
    }

    async fn image_count(&self, repository: &RepositoryName) -> Result<usize, CatalogError> {
        // Counts tag references, without resolving manifests.
        self.tags(repository).await.map(|tags| tags.len())
    }
}

#[async_trait]
impl ImageDeleter for HttpRegistry {
    async fn batch_delete(
        &self,
        repository: &RepositoryName,
        ids: &[ImageIdentifier],
    ) -> Result<DeletionResult, BatchFailure> {
        let mut result = DeletionResult::default();

        for id in ids {
            match self.delete_manifest(repository, id).await {
                Ok(None) => result.deleted(id.clone()),
                Ok(Some((code, reason))) => result.failed(id.clone(), code, reason),
                Err(error) => {
                    tracing::debug!(
                        %repository,
                        resolved = result.deletions.len() + result.failures.len(),
                        error = %error,
                        "Batch stopped early"
                    );
                    return Err(BatchFailure::partial(error, result));
                }
            }
        }

        Ok(result)
    }
}

fn check_status(response: Response, url: &Url) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(CatalogError::Unauthorized(url.to_string()))
        }
        StatusCode::NOT_FOUND => Err(CatalogError::NotFound(url.path().to_string())),
        other => Err(CatalogError::Status {
            status: other.as_u16(),
            url: url.to_string(),
        }),
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_page(headers: &HeaderMap, base: &Url) -> Result<Option<Url>, CatalogError> {
    let Some(link) = headers.get(LINK).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };

    for part in link.split(',') {
        let mut segments = part.split(';');
        let target = segments.next().unwrap_or_default().trim();
        let is_next = segments.any(|s| {
            let s = s.trim();
            s == "rel=\"next\"" || s == "rel=next"
        });
        if is_next {
            let target = target.trim_start_matches('<').trim_end_matches('>');
            return base
                .join(target)
                .map(Some)
                .map_err(|e| CatalogError::InvalidResponse(format!("invalid Link header: {e}")));
        }
    }

    Ok(None)
}

/// Registry error code and message from an OCI distribution error body.
async fn error_details(response: Response) -> (Option<String>, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => match parsed.errors.into_iter().next() {
            Some(entry) => (Some(entry.code), entry.message),
            None => (None, status.to_string()),
        },
        Err(_) if !body.trim().is_empty() => (None, body.trim().to_string()),
        Err(_) => (None, status.to_string()),
    }
}

#[derive(Debug, Clone)]
struct ManifestSummary {
    digest: Digest,
    pushed_at: DateTime<Utc>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(default)]
    repositories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    config: Option<Descriptor>,
    #[serde(default)]
    layers: Vec<Descriptor>,
    #[serde(default)]
    manifests: Vec<Descriptor>,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ImageConfig {
    #[serde(default)]
    created: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn base() -> Url {
        Url::parse("https://registry.example.com/").unwrap()
    }

    #[test]
    fn next_page_follows_rel_next() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("</v2/_catalog?last=web&n=100>; rel=\"next\""),
        );
        let next = next_page(&headers, &base()).unwrap().unwrap();
        assert_eq!(
            next.as_str(),
            "https://registry.example.com/v2/_catalog?last=web&n=100"
        );
    }

    #[test]
    fn next_page_absent_without_link() {
        assert!(next_page(&HeaderMap::new(), &base()).unwrap().is_none());
    }

    #[test]
    fn next_page_ignores_other_relations() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("</v2/_catalog?n=100>; rel=\"prev\""),
        );
        assert!(next_page(&headers, &base()).unwrap().is_none());
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let registry =
            HttpRegistry::new("https://registry.example.com/mirror", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            registry.base_url().as_str(),
            "https://registry.example.com/mirror/"
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = HttpRegistry::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidEndpoint(_)));
    }
}
