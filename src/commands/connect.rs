// ABOUTME: Shared helper for building the registry client from configuration.
// ABOUTME: Attaches credentials and optionally waits for the registry to accept them.

use registry_gc::config::Config;
use registry_gc::error::{Error, Result};
use registry_gc::output::Output;
use registry_gc::readiness::wait_until_ready;
use registry_gc::registry::{Catalog, RegistryClient};
use std::time::Duration;

const READINESS_INTERVAL: Duration = Duration::from_secs(2);

/// Build the configured registry adapter.
///
/// With `execution.wait_for_credentials` set, polls the repository listing
/// until it succeeds or the wait expires.
pub async fn connect(config: &Config, output: &Output) -> Result<RegistryClient> {
    let registry = RegistryClient::from_config(&config.registry).await?;

    if let Some(timeout) = config.execution.wait_for_credentials {
        output.progress(&format!("Waiting for {} to accept requests...", registry.describe()));
        let target = &registry;
        let readiness = wait_until_ready(
            move || async move { target.repositories().await.is_ok() },
            timeout,
            READINESS_INTERVAL,
        )
        .await;

        if !readiness.is_ready() {
            return Err(Error::CredentialsTimedOut(timeout.as_secs()));
        }
    }

    Ok(registry)
}
