// ABOUTME: Integration tests for the Prometheus exporter router.
// ABOUTME: Drives the axum router in-process with tower's oneshot.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use registry_gc::config::ExporterConfig;
use registry_gc::exporter::Exporter;
use registry_gc::registry::InMemoryRegistry;
use std::sync::Arc;
use support::{image, repo};
use tower::ServiceExt;

async fn get(exporter: Arc<Exporter>, uri: &str) -> (StatusCode, String) {
    let response = exporter
        .router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn seeded() -> InMemoryRegistry {
    InMemoryRegistry::new()
        .with_repository(
            repo("web"),
            vec![image(1, &["v1"], 1), image(2, &["v2"], 2), image(3, &[], 3)],
        )
        .with_repository(repo("api"), vec![image(4, &["v1"], 1)])
        .with_repository(repo("broken"), vec![])
}

#[tokio::test]
async fn metrics_report_counts_per_repository() {
    let registry = seeded();
    registry.fail_listing(&repo("broken"));
    let exporter = Arc::new(Exporter::new(Arc::new(registry), &ExporterConfig::default()));

    let (status, body) = get(exporter, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("registry_up 1"), "{body}");
    assert!(body.contains("registry_images{repository=\"web\"} 3"), "{body}");
    assert!(body.contains("registry_images{repository=\"api\"} 1"), "{body}");
    assert!(!body.contains("repository=\"broken\""), "{body}");
}

#[tokio::test]
async fn catalog_failure_reports_down() {
    let registry = seeded();
    registry.fail_catalog();
    let exporter = Arc::new(Exporter::new(Arc::new(registry), &ExporterConfig::default()));

    let (status, body) = get(exporter, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("registry_up 0"), "{body}");
    assert!(!body.contains("registry_images{"), "{body}");
}

#[tokio::test]
async fn each_scrape_reflects_current_state() {
    let registry = Arc::new(seeded());
    let exporter = Arc::new(Exporter::new(registry.clone(), &ExporterConfig::default()));

    let (_, before) = get(exporter.clone(), "/metrics").await;
    registry.fail_catalog();
    let (_, after) = get(exporter, "/metrics").await;

    assert!(before.contains("registry_up 1"));
    assert!(after.contains("registry_up 0"));
}

#[tokio::test]
async fn landing_page_links_metrics_path() {
    let config = ExporterConfig {
        path: "/custom".to_string(),
        ..ExporterConfig::default()
    };
    let exporter = Arc::new(Exporter::new(Arc::new(seeded()), &config));

    let (status, body) = get(exporter.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("href=\"/custom\""));

    let (status, _) = get(exporter.clone(), "/custom").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(exporter, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
