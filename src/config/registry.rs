// ABOUTME: Registry endpoint configuration.
// ABOUTME: Adapter kind, URL or AWS region, optional credentials, request timeout, and page size.

use super::SecretValue;
use crate::registry::StaticCredentials;
use serde::Deserialize;
use std::time::Duration;

/// Which adapter talks to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// OCI distribution (Docker Registry v2) HTTP API.
    #[default]
    Http,
    /// Amazon ECR through the AWS SDK.
    Ecr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub kind: RegistryKind,

    /// Registry base URL. For ECR, an optional endpoint override.
    #[serde(default)]
    pub url: String,

    /// AWS region (ECR only). Falls back to the AWS environment.
    #[serde(default)]
    pub region: Option<String>,

    /// AWS account that owns the registry (ECR only).
    #[serde(default)]
    pub registry_id: Option<String>,

    /// Basic-auth user, or AWS access key id for ECR.
    #[serde(default)]
    pub username: Option<SecretValue>,

    /// Basic-auth password, or AWS secret access key for ECR.
    #[serde(default)]
    pub password: Option<SecretValue>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_size() -> usize {
    100
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RegistryConfig {
            kind: RegistryKind::Http,
            url: url.into(),
            region: None,
            registry_id: None,
            username: None,
            password: None,
            timeout: default_timeout(),
            page_size: default_page_size(),
        }
    }

    /// ECR registry of the caller's account in `region`.
    pub fn ecr(region: impl Into<String>) -> Self {
        RegistryConfig {
            kind: RegistryKind::Ecr,
            region: Some(region.into()),
            ..Self::new(String::new())
        }
    }

    /// Static credentials when both username and password are configured.
    pub fn credentials(&self) -> Option<StaticCredentials> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(StaticCredentials::new(user.clone(), pass.clone())),
            _ => None,
        }
    }
}
