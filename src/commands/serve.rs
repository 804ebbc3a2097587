// ABOUTME: Serve command implementation.
// ABOUTME: Runs the Prometheus exporter until interrupted.

use super::connect::connect;
use registry_gc::config::Config;
use registry_gc::error::{Error, Result};
use registry_gc::exporter::Exporter;
use registry_gc::output::Output;
use std::sync::Arc;

pub async fn serve(config: &Config, output: &Output) -> Result<()> {
    let registry = connect(config, output).await?;
    let exporter = Arc::new(Exporter::new(Arc::new(registry), &config.exporter));

    output.progress(&format!(
        "Serving metrics on http://{}{}",
        config.exporter.listen,
        exporter.path()
    ));

    exporter
        .serve(config.exporter.listen)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
