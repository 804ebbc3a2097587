// ABOUTME: Metrics exporter listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_path")]
    pub path: String,

    /// Concurrent per-repository count requests during a scrape.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8070))
}

fn default_path() -> String {
    "/metrics".to_string()
}

fn default_concurrency() -> usize {
    8
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            listen: default_listen(),
            path: default_path(),
            concurrency: default_concurrency(),
        }
    }
}
