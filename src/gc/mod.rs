// ABOUTME: Garbage collection of registry images.
// ABOUTME: Ties retention policy evaluation to batched deletion and reporting.

mod collector;
mod error;
mod executor;
mod report;

pub use collector::{GarbageCollector, GcOptions, select_repositories};
pub use error::{GcError, GcErrorKind};
pub use executor::{DeletionExecutor, ExecutionOutcome, FailedBatch};
pub use report::{RepositoryReport, RunReport, RunTotals};
