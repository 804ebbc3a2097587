// ABOUTME: Credential capability used by registry adapters.
// ABOUTME: Providers fetch an access/secret pair and report when it has expired.

use crate::config::SecretValue;
use async_trait::async_trait;
use std::fmt;

/// An access key / secret key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("credential provider failed: {0}")]
    Provider(String),
}

/// Source of registry credentials.
///
/// Adapters call [`fetch`](CredentialProvider::fetch) lazily and cache the
/// result until [`is_expired`](CredentialProvider::is_expired) reports true.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<Credentials, CredentialError>;

    fn is_expired(&self) -> bool;
}

/// Credentials taken from configuration values. Never expires.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    access_key: SecretValue,
    secret_key: SecretValue,
}

impl StaticCredentials {
    pub fn new(access_key: SecretValue, secret_key: SecretValue) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn fetch(&self) -> Result<Credentials, CredentialError> {
        Ok(Credentials {
            access_key: self.access_key.resolve()?,
            secret_key: self.secret_key.resolve()?,
        })
    }

    fn is_expired(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret_key() {
        let creds = Credentials {
            access_key: "AKIA".to_string(),
            secret_key: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn static_credentials_resolve_literals() {
        let provider = StaticCredentials::new(
            SecretValue::Literal("user".to_string()),
            SecretValue::Literal("pass".to_string()),
        );
        let creds = provider.fetch().await.unwrap();
        assert_eq!(creds.access_key, "user");
        assert_eq!(creds.secret_key, "pass");
        assert!(!provider.is_expired());
    }
}
