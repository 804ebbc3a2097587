// ABOUTME: Per-repository and per-run reports of a garbage-collection pass.
// ABOUTME: Counts evaluated, marked, and deleted images plus failures with reasons.

use serde::Serialize;

use super::error::{GcError, GcErrorKind};
use crate::registry::{DeletionFailure, DeletionResult, ImageIdentifier};
use crate::types::{Image, RepositoryName};

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryReport {
    pub repository: RepositoryName,
    pub evaluated: usize,
    pub marked: Vec<Image>,
    pub deleted: Vec<ImageIdentifier>,
    pub failures: Vec<DeletionFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<GcErrorKind>,
    pub dry_run: bool,
}

impl RepositoryReport {
    pub fn new(repository: RepositoryName, evaluated: usize, marked: &[&Image]) -> Self {
        Self {
            repository,
            evaluated,
            marked: marked.iter().map(|image| (*image).clone()).collect(),
            deleted: Vec::new(),
            failures: Vec::new(),
            error: None,
            error_kind: None,
            dry_run: false,
        }
    }

    /// Report for a repository whose images could not be fetched.
    pub fn unavailable(repository: RepositoryName, error: &GcError) -> Self {
        Self {
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::new(repository, 0, &[])
        }
    }

    pub fn record(&mut self, result: DeletionResult) {
        self.deleted.extend(result.deletions);
        self.failures.extend(result.failures);
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// No fetch error and no deletion failures.
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub repositories: Vec<RepositoryReport>,
}

/// Totals across all repositories of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub repositories: usize,
    pub evaluated: usize,
    pub marked: usize,
    pub deleted: usize,
    pub failures: usize,
    pub unavailable: usize,
}

impl RunReport {
    pub fn totals(&self) -> RunTotals {
        self.repositories
            .iter()
            .fold(RunTotals::default(), |mut totals, report| {
                totals.repositories += 1;
                totals.evaluated += report.evaluated;
                totals.marked += report.marked_count();
                totals.deleted += report.deleted_count();
                totals.failures += report.failures.len();
                if report.error.is_some() {
                    totals.unavailable += 1;
                }
                totals
            })
    }

    /// Repositories with a fetch error or deletion failures.
    pub fn incomplete(&self) -> usize {
        self.repositories.iter().filter(|r| !r.is_clean()).count()
    }

    pub fn get(&self, repository: &RepositoryName) -> Option<&RepositoryReport> {
        self.repositories.iter().find(|r| &r.repository == repository)
    }
}
