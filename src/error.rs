// ABOUTME: Application-wide error types for registry-gc.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::gc::GcError;
use crate::policy::PolicyError;
use crate::registry::{CatalogError, CredentialError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0} (use --config or --registry)")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid retention policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("registry error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Gc(#[from] GcError),

    #[error("registry did not accept credentials within {0} seconds")]
    CredentialsTimedOut(u64),

    #[error("{failed} of {total} repositories did not complete cleanly")]
    Incomplete { failed: usize, total: usize },

    #[error("metrics server failed: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
