// ABOUTME: Execution tuning for garbage-collection runs.
// ABOUTME: Batch size, repository concurrency, batch retry, and credential wait.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Poll the registry until it accepts requests, up to this long.
    #[serde(default, with = "humantime_serde")]
    pub wait_for_credentials: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_backoff", with = "humantime_serde")]
    pub backoff: Duration,
}

fn default_batch_size() -> usize {
    100
}

fn default_concurrency() -> usize {
    4
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff() -> Duration {
    Duration::from_secs(2)
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: default_attempts(),
            backoff: default_backoff(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            retry: RetryConfig::default(),
            wait_for_credentials: None,
        }
    }
}
