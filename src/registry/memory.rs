// ABOUTME: In-memory registry holding seeded repositories and images.
// ABOUTME: Supports injected listing, item, and whole or partial batch failures.

use super::error::{BatchError, BatchFailure, CatalogError};
use super::types::{DeletionResult, FailureCode, ImageIdentifier};
use super::{Catalog, ImageDeleter, MAX_BATCH_SIZE};
use crate::types::{Digest, Image, RepositoryName};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A registry backed by process memory.
pub struct InMemoryRegistry {
    state: Mutex<State>,
    max_batch_size: usize,
}

#[derive(Default)]
struct State {
    repositories: BTreeMap<RepositoryName, Vec<Image>>,
    unreachable: HashSet<RepositoryName>,
    catalog_down: bool,
    rejections: HashMap<Digest, (FailureCode, String)>,
    batch_failures: HashMap<usize, (usize, BatchError)>,
    delete_calls: Vec<usize>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Override the per-call batch limit.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Seed a repository with images.
    pub fn with_repository(self, name: RepositoryName, images: Vec<Image>) -> Self {
        self.state.lock().repositories.insert(name, images);
        self
    }

    /// Make `images()` fail for a repository.
    pub fn fail_listing(&self, repository: &RepositoryName) {
        self.state.lock().unreachable.insert(repository.clone());
    }

    /// Make `repositories()` fail.
    pub fn fail_catalog(&self) {
        self.state.lock().catalog_down = true;
    }

    /// Reject deletion of one digest with the given code.
    pub fn reject(&self, digest: &Digest, code: FailureCode, reason: &str) {
        self.state
            .lock()
            .rejections
            .insert(digest.clone(), (code, reason.to_string()));
    }

    /// Fail the `call`-th `batch_delete` invocation (zero-based) as a whole.
    pub fn fail_batch_call(&self, call: usize, error: BatchError) {
        self.fail_batch_call_after(call, 0, error);
    }

    /// Fail the `call`-th `batch_delete` invocation after its first
    /// `processed` identifiers have been handled.
    pub fn fail_batch_call_after(&self, call: usize, processed: usize, error: BatchError) {
        self.state
            .lock()
            .batch_failures
            .insert(call, (processed, error));
    }

    /// Sizes of every `batch_delete` call so far, in call order.
    pub fn delete_calls(&self) -> Vec<usize> {
        self.state.lock().delete_calls.clone()
    }

    /// Digests still present in a repository.
    pub fn remaining(&self, repository: &RepositoryName) -> Vec<Digest> {
        self.state
            .lock()
            .repositories
            .get(repository)
            .map(|images| images.iter().map(|i| i.digest().clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Catalog for InMemoryRegistry {
    async fn repositories(&self) -> Result<Vec<RepositoryName>, CatalogError> {
        let state = self.state.lock();
        if state.catalog_down {
            return Err(CatalogError::Transport("catalog unavailable".to_string()));
        }
        Ok(state.repositories.keys().cloned().collect())
    }

    async fn images(&self, repository: &RepositoryName) -> Result<Vec<Image>, CatalogError> {
        let state = self.state.lock();
        if state.unreachable.contains(repository) {
            return Err(CatalogError::Transport(format!(
                "listing {repository} failed"
            )));
        }
        state
            .repositories
            .get(repository)
            .cloned()
            .ok_or_else(|| CatalogError::RepositoryNotFound(repository.to_string()))
    }
}

#[async_trait]
impl ImageDeleter for InMemoryRegistry {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn batch_delete(
        &self,
        repository: &RepositoryName,
        ids: &[ImageIdentifier],
    ) -> Result<DeletionResult, BatchFailure> {
        let mut state = self.state.lock();
        let call = state.delete_calls.len();
        state.delete_calls.push(ids.len());
        let failure = state.batch_failures.remove(&call);
        let stop_at = failure.as_ref().map(|(processed, _)| *processed);

        let mut result = DeletionResult::default();
        for (position, id) in ids.iter().enumerate() {
            if stop_at == Some(position) {
                break;
            }

            if let Some((code, reason)) = state.rejections.get(&id.digest).cloned() {
                result.failed(id.clone(), code, reason);
                continue;
            }

            let images = state.repositories.entry(repository.clone()).or_default();
            match images.iter().position(|i| i.digest() == &id.digest) {
                Some(idx) => {
                    images.remove(idx);
                    result.deleted(id.clone());
                }
                None => result.failed(
                    id.clone(),
                    FailureCode::ImageNotFound,
                    "requested image not found",
                ),
            }
        }

        match failure {
            Some((_, error)) => Err(BatchFailure::partial(error, result)),
            None => Ok(result),
        }
    }
}
