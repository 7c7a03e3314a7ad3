use std::time::{Duration, Instant};

use tfstate_inventory::sources::retry::RetryPolicy;
use tfstate_inventory::{ConfigError, Credentials, ErrorCategory, S3Client, S3Error};
use wiremock::matchers::{header_exists, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(endpoint: &str) -> S3Client {
    S3Client::new(
        endpoint,
        "ru-central1",
        "terraform",
        Credentials::new("test_access_key", "test_secret_key"),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
    let contents: String = keys
        .iter()
        .map(|key| {
            format!(
                "<Contents><Key>{key}</Key><LastModified>2024-03-01T10:00:00.000Z</LastModified><Size>100</Size></Contents>"
            )
        })
        .collect();
    let truncated = next_token.is_some();
    let token = next_token
        .map(|t| format!("<NextContinuationToken>{t}</NextContinuationToken>"))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>terraform</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>{truncated}</IsTruncated>{contents}{token}</ListBucketResult>"#,
        keys.len()
    )
}

fn error_body(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>{code}</Code><Message>{message}</Message><RequestId>4442587FB7D0A2F9</RequestId></Error>"#
    )
}

#[tokio::test]
async fn test_list_objects_follows_continuation_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform"))
        .and(query_param("list-type", "2"))
        .and(query_param("prefix", "production/"))
        .and(query_param_is_missing("continuation-token"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("x-amz-content-sha256"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_page(
            &["production/k8s/terraform.tfstate", "production/kafka/terraform.tfstate"],
            Some("page-2"),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/terraform"))
        .and(query_param("continuation-token", "page-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(list_page(&["production/web/terraform.tfstate"], None)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let objects = client(&mock_server.uri())
        .list_objects("production/")
        .await
        .unwrap();

    let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "production/k8s/terraform.tfstate",
            "production/kafka/terraform.tfstate",
            "production/web/terraform.tfstate",
        ]
    );
}

#[tokio::test]
async fn test_get_object_returns_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/production/k8s/terraform.tfstate"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version": 4}"#))
        .mount(&mock_server)
        .await;

    let body = client(&mock_server.uri())
        .get_object("production/k8s/terraform.tfstate")
        .await
        .unwrap();
    assert_eq!(body, br#"{"version": 4}"#);
}

#[tokio::test]
async fn test_access_denied_is_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string(error_body("AccessDenied", "Access Denied")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri()).list_objects("").await.unwrap_err();
    assert!(matches!(err, S3Error::Auth { status: 403, .. }));

    let config_err: ConfigError = err.into();
    assert_eq!(config_err.category, ErrorCategory::Authentication);
    assert!(!config_err.message.contains("test_secret_key"));
}

#[tokio::test]
async fn test_signature_mismatch_is_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/a.tfstate"))
        .respond_with(ResponseTemplate::new(403).set_body_string(error_body(
            "SignatureDoesNotMatch",
            "The request signature we calculated does not match the signature you provided.",
        )))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri()).get_object("a.tfstate").await.unwrap_err();
    let config_err: ConfigError = err.into();
    assert_eq!(config_err.category, ErrorCategory::Authentication);
}

#[tokio::test]
async fn test_missing_bucket_is_connectivity_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform"))
        .respond_with(ResponseTemplate::new(404).set_body_string(error_body(
            "NoSuchBucket",
            "The specified bucket does not exist",
        )))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri()).list_objects("").await.unwrap_err();
    assert!(matches!(err, S3Error::BucketNotFound { ref bucket } if bucket == "terraform"));

    let config_err: ConfigError = err.into();
    assert_eq!(config_err.category, ErrorCategory::Connectivity);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/a.tfstate"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string(error_body("InternalError", "We encountered an internal error.")),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/terraform/a.tfstate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = client(&mock_server.uri()).get_object("a.tfstate").await.unwrap();
    assert_eq!(body, b"{}");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/a.tfstate"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string(error_body("SlowDown", "Please reduce your request rate.")),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server.uri()).with_retry_policy(RetryPolicy::with_max_attempts(2));
    let err = client.get_object("a.tfstate").await.unwrap_err();
    assert!(matches!(err, S3Error::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_missing_object_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/gone.tfstate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(error_body("NoSuchKey", "The specified key does not exist.")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .get_object("gone.tfstate")
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::ObjectNotFound { ref key } if key == "gone.tfstate"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connectivity_error() {
    let client = S3Client::new(
        "http://127.0.0.1:1",
        "us-east-1",
        "terraform",
        Credentials::new("a", "b"),
        Duration::from_secs(2),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::with_max_attempts(1));

    let err = client.list_objects("").await.unwrap_err();
    assert!(matches!(err, S3Error::Network(_)));

    let config_err: ConfigError = err.into();
    assert_eq!(config_err.category, ErrorCategory::Connectivity);
}

#[tokio::test]
async fn test_dot_segment_keys_are_never_requested() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/x.tfstate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("WRONG"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server.uri());
    for key in ["prod/../x.tfstate", "./x.tfstate"] {
        let err = client.get_object(key).await.unwrap_err();
        assert!(matches!(err, S3Error::UnaddressableKey { key: ref k } if k == key));

        let config_err: ConfigError = err.into();
        assert_eq!(config_err.category, ErrorCategory::Configuration);
        assert!(config_err.message.contains(key));
    }
}

#[tokio::test]
async fn test_stalled_endpoint_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/terraform/slow.tfstate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = S3Client::new(
        &mock_server.uri(),
        "ru-central1",
        "terraform",
        Credentials::new("test_access_key", "test_secret_key"),
        Duration::from_secs(1),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::with_max_attempts(1));

    let started = Instant::now();
    let err = client.get_object("slow.tfstate").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, S3Error::Network(ref e) if e.is_timeout()), "{err}");
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");

    let config_err: ConfigError = err.into();
    assert_eq!(config_err.category, ErrorCategory::Connectivity);
}
