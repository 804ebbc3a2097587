// ABOUTME: Configuration types and parsing for registry-gc.yml.
// ABOUTME: Handles YAML parsing, file discovery, and validation before any run starts.

mod execution;
mod exporter;
mod init;
mod registry;
mod secret;

pub use execution::{ExecutionConfig, RetryConfig};
pub use exporter::ExporterConfig;
pub use init::init_config;
pub use registry::{RegistryConfig, RegistryKind};
pub use secret::SecretValue;

use crate::error::{Error, Result};
use crate::policy::RetentionPolicy;
use crate::types::RepositoryName;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "registry-gc.yml";
pub const CONFIG_FILENAME_ALT: &str = "registry-gc.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".registry-gc/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,

    #[serde(default)]
    pub policy: RetentionPolicy,

    /// Repositories to process. Empty means every repository in the catalog.
    #[serde(default)]
    pub repositories: Vec<RepositoryName>,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub exporter: ExporterConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Configuration with defaults for everything but the registry URL.
    pub fn for_registry(url: impl Into<String>) -> Self {
        Config {
            registry: RegistryConfig::new(url),
            policy: RetentionPolicy::default(),
            repositories: Vec::new(),
            execution: ExecutionConfig::default(),
            exporter: ExporterConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.kind == RegistryKind::Http && self.registry.url.trim().is_empty() {
            return Err(Error::InvalidConfig("registry.url cannot be empty".to_string()));
        }
        if self.execution.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "execution.batch_size must be at least 1".to_string(),
            ));
        }
        if self.execution.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "execution.concurrency must be at least 1".to_string(),
            ));
        }
        if self.exporter.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "exporter.concurrency must be at least 1".to_string(),
            ));
        }
        if !self.exporter.path.starts_with('/') || self.exporter.path == "/" {
            return Err(Error::InvalidConfig(format!(
                "exporter.path must be an absolute path other than '/', got '{}'",
                self.exporter.path
            )));
        }
        if self.registry.username.is_some() != self.registry.password.is_some() {
            return Err(Error::InvalidConfig(
                "registry.username and registry.password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}
