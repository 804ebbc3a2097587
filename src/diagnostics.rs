// ABOUTME: Diagnostics accumulator for non-fatal problems during a collection run.
// ABOUTME: Collects skipped repositories and rejected deletions for the final summary.

use crate::gc::{GcErrorKind, RunReport};
use crate::registry::FailureCode;

/// Collects non-fatal warnings during a run.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Derive warnings from a finished run.
    pub fn from_report(report: &RunReport) -> Self {
        let mut diag = Diagnostics::default();

        for repo in &report.repositories {
            if let Some(ref error) = repo.error {
                let warning = match repo.error_kind {
                    Some(GcErrorKind::Unauthorized) => {
                        Warning::unauthorized(format!("{}: {error}", repo.repository))
                    }
                    _ => Warning::repository_skipped(format!("{}: {error}", repo.repository)),
                };
                diag.warn(warning);
            }

            for failure in &repo.failures {
                let message = format!(
                    "{}: {} not deleted ({}: {})",
                    repo.repository, failure.id.digest, failure.code, failure.reason
                );
                match failure.code {
                    FailureCode::BatchFailed => diag.warn(Warning::batch_abandoned(message)),
                    _ => diag.warn(Warning::deletion_rejected(message)),
                }
            }
        }

        diag
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn repository_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RepositorySkipped,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Unauthorized,
            message: message.into(),
        }
    }

    pub fn deletion_rejected(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DeletionRejected,
            message: message.into(),
        }
    }

    pub fn batch_abandoned(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::BatchAbandoned,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Images of a repository could not be listed; nothing was evaluated.
    RepositorySkipped,
    /// The registry refused our credentials.
    Unauthorized,
    /// The registry refused to delete one image.
    DeletionRejected,
    /// A batch kept failing after every retry.
    BatchAbandoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::{GcError, RepositoryReport};
    use crate::registry::{CatalogError, DeletionResult, ImageIdentifier};
    use crate::types::{Digest, RepositoryName};

    fn repo(name: &str) -> RepositoryName {
        RepositoryName::new(name).unwrap()
    }

    fn id(hex: char) -> ImageIdentifier {
        let digest = Digest::parse(&format!("sha256:{}", hex.to_string().repeat(64))).unwrap();
        ImageIdentifier::digest(digest)
    }

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn clean_report_has_no_warnings() {
        let report = RunReport {
            repositories: vec![RepositoryReport::new(repo("web"), 3, &[])],
        };
        assert!(!Diagnostics::from_report(&report).has_warnings());
    }

    #[test]
    fn report_problems_become_warnings() {
        let skipped = RepositoryReport::unavailable(
            repo("api"),
            &GcError::ListImages {
                repository: repo("api"),
                source: CatalogError::Transport("timeout".to_string()),
            },
        );
        let denied = RepositoryReport::unavailable(
            repo("db"),
            &GcError::ListImages {
                repository: repo("db"),
                source: CatalogError::Unauthorized("HTTP 401".to_string()),
            },
        );

        let mut web = RepositoryReport::new(repo("web"), 10, &[]);
        let mut result = DeletionResult::default();
        result.failed(id('a'), FailureCode::ImageReferenced, "in use");
        result.failed(id('b'), FailureCode::BatchFailed, "reset");
        web.record(result);

        let diag = Diagnostics::from_report(&RunReport {
            repositories: vec![skipped, denied, web],
        });

        assert_eq!(diag.warnings().len(), 4);
        assert_eq!(diag.count(WarningKind::RepositorySkipped), 1);
        assert_eq!(diag.count(WarningKind::Unauthorized), 1);
        assert_eq!(diag.count(WarningKind::DeletionRejected), 1);
        assert_eq!(diag.count(WarningKind::BatchAbandoned), 1);
    }
}
