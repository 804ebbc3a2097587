// ABOUTME: Deletion executor submitting a deletion set in fixed-size batches.
// ABOUTME: Separates confirmed deletions, per-item failures, and whole-batch errors.

use nonempty::NonEmpty;

use crate::registry::{BatchError, BatchFailure, DeletionResult, ImageDeleter, ImageIdentifier};
use crate::types::{Image, RepositoryName};

/// A batch that failed before every identifier in it was resolved.
#[derive(Debug, Clone)]
pub struct FailedBatch {
    /// Zero-based position of the batch within the execution.
    pub index: usize,
    /// Identifiers with no deletion or item failure recorded yet.
    pub ids: NonEmpty<ImageIdentifier>,
    pub error: BatchError,
}

/// Identifiers of `batch` that `completed` says nothing about, in order.
pub fn unresolved(
    batch: &NonEmpty<ImageIdentifier>,
    completed: &DeletionResult,
) -> Option<NonEmpty<ImageIdentifier>> {
    let rest: Vec<ImageIdentifier> = batch
        .iter()
        .filter(|id| !completed.resolves(id))
        .cloned()
        .collect();
    NonEmpty::from_vec(rest)
}

/// Aggregated result of one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub result: DeletionResult,
    pub failed_batches: Vec<FailedBatch>,
}

impl ExecutionOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// Submits deletions through an [`ImageDeleter`] in sequential batches.
///
/// No retry happens here; callers decide what to do with
/// [`ExecutionOutcome::failed_batches`] and can resubmit them with
/// [`submit_batch`](DeletionExecutor::submit_batch).
pub struct DeletionExecutor<'a, D: ?Sized> {
    deleter: &'a D,
    batch_size: usize,
}

impl<'a, D: ImageDeleter + ?Sized> DeletionExecutor<'a, D> {
    /// `batch_size` is clamped to `1..=deleter.max_batch_size()`.
    pub fn new(deleter: &'a D, batch_size: usize) -> Self {
        let limit = deleter.max_batch_size().max(1);
        Self {
            deleter,
            batch_size: batch_size.clamp(1, limit),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Split images into digest-only identifier batches, preserving order.
    pub fn batches(&self, images: &[&Image]) -> Vec<NonEmpty<ImageIdentifier>> {
        let ids: Vec<ImageIdentifier> = images
            .iter()
            .map(|image| ImageIdentifier::from(*image))
            .collect();
        ids.chunks(self.batch_size)
            .filter_map(NonEmpty::from_slice)
            .collect()
    }

    /// Submit a single batch.
    pub async fn submit_batch(
        &self,
        repository: &RepositoryName,
        batch: &NonEmpty<ImageIdentifier>,
    ) -> Result<DeletionResult, BatchFailure> {
        let ids: Vec<ImageIdentifier> = batch.iter().cloned().collect();
        self.deleter.batch_delete(repository, &ids).await
    }

    /// Delete `images`, continuing past failed batches.
    pub async fn execute(
        &self,
        repository: &RepositoryName,
        images: &[&Image],
    ) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::default();

        for (index, batch) in self.batches(images).into_iter().enumerate() {
            match self.submit_batch(repository, &batch).await {
                Ok(result) => {
                    tracing::debug!(
                        %repository,
                        batch = index,
                        deleted = result.deletions.len(),
                        failed = result.failures.len(),
                        "Batch deletion finished"
                    );
                    outcome.result.merge(result);
                }
                Err(BatchFailure { error, completed }) => {
                    let remaining = unresolved(&batch, &completed);
                    tracing::warn!(
                        %repository,
                        batch = index,
                        size = batch.len(),
                        resolved = completed.deletions.len() + completed.failures.len(),
                        error = %error,
                        "Batch deletion failed"
                    );
                    outcome.result.merge(completed);
                    if let Some(ids) = remaining {
                        outcome.failed_batches.push(FailedBatch { index, ids, error });
                    }
                }
            }
        }

        outcome
    }
}
