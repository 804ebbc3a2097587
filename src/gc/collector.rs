// ABOUTME: Garbage collector driving policy evaluation and deletion per repository.
// ABOUTME: Processes repositories concurrently, retries failed batches, isolates failures.

use futures::stream::{self, StreamExt};
use snafu::ResultExt;
use tracing::Instrument;

use super::error::{GcError, ListImagesSnafu, ListRepositoriesSnafu};
use super::executor::{DeletionExecutor, FailedBatch, unresolved};
use super::report::{RepositoryReport, RunReport};
use crate::config::{ExecutionConfig, RetryConfig};
use crate::policy::{RetentionPolicy, compute_deletion_set};
use crate::registry::{BatchFailure, Catalog, DeletionResult, FailureCode, Registry};
use crate::types::RepositoryName;

/// Tuning for a collection run.
#[derive(Debug, Clone)]
pub struct GcOptions {
    pub batch_size: usize,
    /// Repositories processed at the same time.
    pub concurrency: usize,
    pub retry: RetryConfig,
    /// Evaluate and report without deleting anything.
    pub dry_run: bool,
}

impl GcOptions {
    pub fn from_config(execution: &ExecutionConfig) -> Self {
        GcOptions {
            batch_size: execution.batch_size,
            concurrency: execution.concurrency,
            retry: execution.retry,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for GcOptions {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

/// Repositories in the catalog, restricted to `filter` when it is non-empty.
/// Filter entries missing from the catalog are logged and dropped.
pub async fn select_repositories<C: Catalog + ?Sized>(
    catalog: &C,
    filter: &[RepositoryName],
) -> Result<Vec<RepositoryName>, GcError> {
    let mut repositories = catalog.repositories().await.context(ListRepositoriesSnafu)?;
    repositories.sort();
    repositories.dedup();

    if filter.is_empty() {
        return Ok(repositories);
    }

    for wanted in filter {
        if repositories.binary_search(wanted).is_err() {
            tracing::warn!(repository = %wanted, "Repository not found in catalog");
        }
    }
    repositories.retain(|repository| filter.contains(repository));
    Ok(repositories)
}

pub struct GarbageCollector<'a, R: ?Sized> {
    registry: &'a R,
    policy: &'a RetentionPolicy,
    options: GcOptions,
}

impl<'a, R: Registry + ?Sized> GarbageCollector<'a, R> {
    pub fn new(registry: &'a R, policy: &'a RetentionPolicy, options: GcOptions) -> Self {
        Self {
            registry,
            policy,
            options,
        }
    }

    /// Repositories to process. See [`select_repositories`].
    pub async fn repositories(
        &self,
        filter: &[RepositoryName],
    ) -> Result<Vec<RepositoryName>, GcError> {
        select_repositories(self.registry, filter).await
    }

    /// Collect every repository. A failing repository never aborts the
    /// others; its report carries the error instead.
    pub async fn run(&self, repositories: &[RepositoryName]) -> RunReport {
        tracing::info!(
            repositories = repositories.len(),
            dry_run = self.options.dry_run,
            policy = ?self.policy,
            "Starting garbage collection"
        );

        let mut reports: Vec<RepositoryReport> = stream::iter(repositories)
            .map(|repository| {
                self.collect(repository)
                    .instrument(tracing::info_span!("repository", %repository))
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        reports.sort_by(|a, b| a.repository.cmp(&b.repository));
        RunReport {
            repositories: reports,
        }
    }

    /// Evaluate and clean a single repository.
    pub async fn collect(&self, repository: &RepositoryName) -> RepositoryReport {
        let images = match self
            .registry
            .images(repository)
            .await
            .context(ListImagesSnafu {
                repository: repository.clone(),
            }) {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping repository");
                return RepositoryReport::unavailable(repository.clone(), &e);
            }
        };

        let marked = compute_deletion_set(&images, self.policy);
        let mut report = RepositoryReport::new(repository.clone(), images.len(), &marked);
        tracing::info!(
            images = images.len(),
            marked = marked.len(),
            "Evaluated retention policy"
        );

        if marked.is_empty() {
            return report;
        }

        if self.options.dry_run {
            report.dry_run = true;
            return report;
        }

        let executor = DeletionExecutor::new(self.registry, self.options.batch_size);
        let outcome = executor.execute(repository, &marked).await;
        let mut result = outcome.result;

        for failed in outcome.failed_batches {
            self.retry_batch(&executor, repository, failed, &mut result).await;
        }

        tracing::info!(
            deleted = result.deletions.len(),
            failed = result.failures.len(),
            "Repository collected"
        );
        report.record(result);
        report
    }

    /// Resubmit the unresolved part of a failed batch until it succeeds or
    /// the retry budget runs out. Whatever is still unresolved afterwards is
    /// recorded as a [`FailureCode::BatchFailed`] item failure.
    async fn retry_batch(
        &self,
        executor: &DeletionExecutor<'_, R>,
        repository: &RepositoryName,
        failed: FailedBatch,
        result: &mut DeletionResult,
    ) {
        let FailedBatch {
            index,
            mut ids,
            mut error,
        } = failed;
        let RetryConfig { attempts, backoff } = self.options.retry;

        for attempt in 1..=attempts {
            tokio::time::sleep(backoff).await;
            match executor.submit_batch(repository, &ids).await {
                Ok(retried) => {
                    tracing::info!(batch = index, attempt, "Batch succeeded on retry");
                    result.merge(retried);
                    return;
                }
                Err(BatchFailure { error: e, completed }) => {
                    tracing::warn!(batch = index, attempt, error = %e, "Batch retry failed");
                    let remaining = unresolved(&ids, &completed);
                    result.merge(completed);
                    error = e;
                    match remaining {
                        Some(rest) => ids = rest,
                        None => return,
                    }
                }
            }
        }

        let abandoned = GcError::Batch {
            repository: repository.clone(),
            batch: index,
            attempts: attempts + 1,
            source: error,
        };
        tracing::error!(error = %abandoned, "Abandoning batch");
        let reason = abandoned.to_string();
        for id in ids {
            result.failed(id, FailureCode::BatchFailed, reason.clone());
        }
    }
}
