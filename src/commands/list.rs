// ABOUTME: List command implementation.
// ABOUTME: Prints the images of each selected repository, newest first.

use super::connect::connect;
use registry_gc::config::Config;
use registry_gc::error::{Error, Result};
use registry_gc::gc::select_repositories;
use registry_gc::output::Output;
use registry_gc::registry::Catalog;

pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let registry = connect(config, output).await?;
    let repositories = select_repositories(&registry, &config.repositories).await?;

    let mut failed = 0;
    for repository in &repositories {
        match registry.images(repository).await {
            Ok(images) => output.images(repository, &images),
            Err(e) => {
                output.error(&format!("{repository}: {e}"));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Error::Incomplete {
            failed,
            total: repositories.len(),
        });
    }
    Ok(())
}
