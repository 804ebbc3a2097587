// ABOUTME: Integration tests for the ECR adapter against a mock AWS JSON endpoint.
// ABOUTME: Covers untagged listing, pagination, batch deletion results, and error mapping.

mod support;

use registry_gc::config::{RetryConfig, SecretValue};
use registry_gc::gc::{GarbageCollector, GcOptions};
use registry_gc::policy::RetentionPolicy;
use registry_gc::registry::{
    BatchError, Catalog, CatalogError, EcrRegistry, EcrSettings, FailureCode, ImageDeleter,
    ImageIdentifier, StaticCredentials,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use support::{digest, repo};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AWS_JSON: &str = "application/x-amz-json-1.1";
const ACCOUNT: &str = "123456789012";

/// 2024-01-01T10:00:00Z
const PUSHED: i64 = 1_704_103_200;

async fn registry(server: &MockServer) -> EcrRegistry {
    let settings = EcrSettings {
        region: Some("us-east-1".to_string()),
        registry_id: Some(ACCOUNT.to_string()),
        endpoint: Some(server.uri()),
        timeout: Some(Duration::from_secs(5)),
    };
    let credentials = StaticCredentials::new(
        SecretValue::Literal("AKIAEXAMPLE".to_string()),
        SecretValue::Literal("secret".to_string()),
    );
    EcrRegistry::connect(settings, Some(Arc::new(credentials))).await
}

fn operation(name: &str) -> wiremock::matchers::HeaderExactMatcher {
    header(
        "x-amz-target",
        format!("AmazonEC2ContainerRegistry_V20150921.{name}").as_str(),
    )
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), AWS_JSON)
}

fn error(code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400)
        .set_body_raw(json!({ "__type": code, "message": message }).to_string(), AWS_JSON)
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn describe_repositories_follows_next_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("DescribeRepositories"))
            .and(body_partial_json(json!({ "nextToken": "page-2" })))
            .respond_with(ok(json!({
                "repositories": [ { "repositoryName": "team/web" } ]
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(operation("DescribeRepositories"))
            .and(body_partial_json(json!({ "registryId": ACCOUNT })))
            .respond_with(ok(json!({
                "repositories": [ { "repositoryName": "api" } ],
                "nextToken": "page-2"
            })))
            .mount(&server)
            .await;

        let repositories = registry(&server).await.repositories().await.unwrap();

        assert_eq!(repositories, vec![repo("api"), repo("team/web")]);
    }

    #[tokio::test]
    async fn describe_images_includes_untagged_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("DescribeImages"))
            .and(body_partial_json(json!({ "repositoryName": "web" })))
            .respond_with(ok(json!({
                "imageDetails": [
                    {
                        "imageDigest": digest(1).as_str(),
                        "imageTags": ["release-1", "latest"],
                        "imagePushedAt": PUSHED,
                        "imageSizeInBytes": 2048
                    },
                    {
                        "imageDigest": digest(2).as_str(),
                        "imagePushedAt": PUSHED - 3600
                    }
                ]
            })))
            .mount(&server)
            .await;

        let images = registry(&server).await.images(&repo("web")).await.unwrap();

        assert_eq!(images.len(), 2);
        let tagged = images.iter().find(|i| i.digest() == &digest(1)).unwrap();
        assert_eq!(tagged.tags().collect::<Vec<_>>(), vec!["latest", "release-1"]);
        assert_eq!(tagged.pushed_at().timestamp(), PUSHED);
        assert_eq!(tagged.size(), Some(2048));

        let untagged = images.iter().find(|i| i.digest() == &digest(2)).unwrap();
        assert!(untagged.is_untagged());
        assert_eq!(untagged.pushed_at().timestamp(), PUSHED - 3600);
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("DescribeImages"))
            .respond_with(error(
                "RepositoryNotFoundException",
                "The repository with name 'ghost' does not exist",
            ))
            .mount(&server)
            .await;

        let err = registry(&server)
            .await
            .images(&repo("ghost"))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::RepositoryNotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn access_denied_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("DescribeRepositories"))
            .respond_with(error("AccessDeniedException", "not authorized"))
            .mount(&server)
            .await;

        let err = registry(&server).await.repositories().await.unwrap_err();

        assert!(matches!(err, CatalogError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn image_count_counts_listed_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("ListImages"))
            .respond_with(ok(json!({
                "imageIds": [
                    { "imageDigest": digest(1).as_str(), "imageTag": "v1" },
                    { "imageDigest": digest(1).as_str(), "imageTag": "latest" },
                    { "imageDigest": digest(2).as_str() }
                ]
            })))
            .mount(&server)
            .await;

        let count = registry(&server)
            .await
            .image_count(&repo("web"))
            .await
            .unwrap();

        assert_eq!(count, 3);
    }
}

mod deletion {
    use super::*;

    fn ids(range: std::ops::Range<u64>) -> Vec<ImageIdentifier> {
        range.map(|n| ImageIdentifier::digest(digest(n))).collect()
    }

    #[tokio::test]
    async fn maps_item_failures_and_merges_tag_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("BatchDeleteImage"))
            .and(body_partial_json(json!({
                "repositoryName": "web",
                "registryId": ACCOUNT
            })))
            .respond_with(ok(json!({
                "imageIds": [
                    { "imageDigest": digest(3).as_str(), "imageTag": "v3" },
                    { "imageDigest": digest(0).as_str(), "imageTag": "v1" },
                    { "imageDigest": digest(0).as_str(), "imageTag": "latest" }
                ],
                "failures": [
                    {
                        "imageId": { "imageDigest": digest(2).as_str() },
                        "failureCode": "ImageReferencedByManifestList",
                        "failureReason": "referenced by an index"
                    },
                    {
                        "imageId": { "imageDigest": digest(1).as_str() },
                        "failureCode": "ImageNotFound",
                        "failureReason": "Requested image not found"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = registry(&server)
            .await
            .batch_delete(&repo("web"), &ids(0..4))
            .await
            .unwrap();

        assert_eq!(
            result.deletions,
            vec![ids(0..1)[0].clone(), ids(3..4)[0].clone()]
        );
        let codes: Vec<_> = result.failures.iter().map(|f| f.code.clone()).collect();
        assert_eq!(
            codes,
            vec![FailureCode::ImageNotFound, FailureCode::ImageReferenced]
        );
        assert_eq!(result.failures[1].reason, "referenced by an index");
    }

    #[tokio::test]
    async fn access_denied_fails_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("BatchDeleteImage"))
            .respond_with(error("AccessDeniedException", "not authorized"))
            .mount(&server)
            .await;

        let failure = registry(&server)
            .await
            .batch_delete(&repo("web"), &ids(0..2))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, BatchError::Unauthorized(_)));
        assert!(failure.completed.is_empty());
    }

    #[tokio::test]
    async fn batch_limit_is_one_hundred() {
        let server = MockServer::start().await;
        assert_eq!(registry(&server).await.max_batch_size(), 100);
    }
}

mod collection {
    use super::*;

    #[tokio::test]
    async fn untagged_images_are_collected() {
        support::init_tracing();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(operation("DescribeImages"))
            .respond_with(ok(json!({
                "imageDetails": [
                    {
                        "imageDigest": digest(1).as_str(),
                        "imageTags": ["latest"],
                        "imagePushedAt": PUSHED
                    },
                    {
                        "imageDigest": digest(2).as_str(),
                        "imagePushedAt": PUSHED - 60
                    }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(operation("BatchDeleteImage"))
            .and(body_partial_json(json!({
                "imageIds": [ { "imageDigest": digest(2).as_str() } ]
            })))
            .respond_with(ok(json!({
                "imageIds": [ { "imageDigest": digest(2).as_str() } ],
                "failures": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry(&server).await;
        let policy = RetentionPolicy::new().with_delete_untagged(true);
        let options = GcOptions {
            batch_size: 100,
            concurrency: 1,
            retry: RetryConfig {
                attempts: 0,
                backoff: Duration::ZERO,
            },
            dry_run: false,
        };

        let report = GarbageCollector::new(&registry, &policy, options)
            .run(&[repo("web")])
            .await;

        let web = &report.repositories[0];
        assert_eq!(web.evaluated, 2);
        assert_eq!(web.marked_count(), 1);
        assert_eq!(web.deleted, vec![ImageIdentifier::digest(digest(2))]);
        assert!(web.is_clean());
    }
}
