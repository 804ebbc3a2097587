// ABOUTME: Prometheus exporter for per-repository image counts.
// ABOUTME: Renders a fresh recorder per scrape and serves it over axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, StreamExt};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::ExporterConfig;
use crate::registry::Catalog;
use crate::types::RepositoryName;

/// 1 when the repository listing succeeded, 0 otherwise.
pub const REGISTRY_UP: &str = "registry_up";

/// Image references per repository, labelled by `repository`.
pub const REGISTRY_IMAGES: &str = "registry_images";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Values gathered for one scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub up: bool,
    /// Repositories whose count succeeded, sorted by name.
    pub counts: Vec<(RepositoryName, usize)>,
}

pub struct Exporter {
    catalog: Arc<dyn Catalog>,
    path: String,
    concurrency: usize,
}

impl Exporter {
    pub fn new(catalog: Arc<dyn Catalog>, config: &ExporterConfig) -> Self {
        Self {
            catalog,
            path: config.path.clone(),
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query the catalog. Count failures drop that repository's gauge.
    pub async fn snapshot(&self) -> Snapshot {
        let repositories = match self.catalog.repositories().await {
            Ok(repositories) => repositories,
            Err(e) => {
                tracing::warn!(error = %e, "Registry listing failed");
                return Snapshot::default();
            }
        };

        let catalog = &self.catalog;
        let mut counts: Vec<(RepositoryName, usize)> = stream::iter(repositories)
            .map(|repository| async move {
                match catalog.image_count(&repository).await {
                    Ok(count) => Some((repository, count)),
                    Err(e) => {
                        tracing::warn!(%repository, error = %e, "Image count failed");
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|count| async move { count })
            .collect()
            .await;

        counts.sort();
        Snapshot { up: true, counts }
    }

    /// Prometheus text exposition of a fresh snapshot.
    pub async fn render(&self) -> String {
        render_snapshot(&self.snapshot().await)
    }

    pub fn router(self: Arc<Self>) -> Router {
        let path = self.path.clone();
        Router::new()
            .route("/", get(landing))
            .route(&path, get(scrape))
            .with_state(self)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self: Arc<Self>, listen: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(listen).await?;
        tracing::info!(%listen, path = %self.path, "Serving metrics");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down metrics server");
            })
            .await
    }
}

fn render_snapshot(snapshot: &Snapshot) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        describe_gauge!(REGISTRY_UP, "Whether the registry repository listing succeeded");
        describe_gauge!(REGISTRY_IMAGES, "Number of images in a repository");

        gauge!(REGISTRY_UP).set(if snapshot.up { 1.0 } else { 0.0 });
        for (repository, count) in &snapshot.counts {
            gauge!(REGISTRY_IMAGES, "repository" => repository.to_string()).set(*count as f64);
        }
    });

    handle.render()
}

async fn scrape(State(exporter): State<Arc<Exporter>>) -> impl IntoResponse {
    let body = exporter.render().await;
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

async fn landing(State(exporter): State<Arc<Exporter>>) -> Html<String> {
    Html(format!(
        "<html><head><title>Registry Exporter</title></head><body>\
         <h1>Registry Exporter</h1><p><a href=\"{0}\">{0}</a></p></body></html>",
        exporter.path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> RepositoryName {
        RepositoryName::new(name).unwrap()
    }

    #[test]
    fn renders_up_and_counts() {
        let snapshot = Snapshot {
            up: true,
            counts: vec![(repo("api"), 3), (repo("web"), 12)],
        };
        let text = render_snapshot(&snapshot);

        assert!(text.contains("registry_up 1"));
        assert!(text.contains("registry_images{repository=\"api\"} 3"));
        assert!(text.contains("registry_images{repository=\"web\"} 12"));
    }

    #[test]
    fn renders_down_without_counts() {
        let text = render_snapshot(&Snapshot::default());

        assert!(text.contains("registry_up 0"));
        assert!(!text.contains("registry_images{"));
    }
}
