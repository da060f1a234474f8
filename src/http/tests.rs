//! Tests for the HTTP client module

use super::*;
use crate::auth::{Authenticator, Credentials, TOKEN_PATH};
use crate::error::Error;
use crate::pagination::fetch_all_pages;
use crate::types::{BackoffType, StringMap};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .rate_limit(None)
        .build();
    HttpClient::with_config(config).unwrap()
}

fn token_authenticator(server: &MockServer) -> Authenticator {
    Authenticator::new(
        Credentials::new("id", "secret"),
        format!("{}{TOKEN_PATH}", server.uri()),
    )
}

fn no_query() -> StringMap {
    StringMap::new()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("sophos-central-rs/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api-us01.central.sophos.com")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Tenant-ID", "t-1")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(
        config.base_url.as_deref(),
        Some("https://api-us01.central.sophos.com")
    );
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(30));
    assert_eq!(
        config.default_headers.get("X-Tenant-ID").map(String::as_str),
        Some("t-1")
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_get_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints/ep-1/tamper-protection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enabled": true,
            "password": "x"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let data: Value = client
        .get_json("/endpoint/v1/endpoints/ep-1/tamper-protection", &no_query())
        .await
        .unwrap();

    assert_eq!(data["enabled"], true);
}

#[tokio::test]
async fn test_query_params_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(query_param("severity", "high"))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = StringMap::from([
        ("severity".to_string(), "high".to_string()),
        ("pageSize".to_string(), "50".to_string()),
    ]);
    let client = client_for(&mock_server);
    let body: Value = client.get_json("/common/v1/alerts", &query).await.unwrap();

    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_scope_header_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/partner/v1/tenants"))
        .and(header("X-Partner-ID", "p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .header("X-Partner-ID", "p-1")
        .rate_limit(None)
        .build();

    let client = HttpClient::with_config(config).unwrap();
    let body: Value = client
        .get_json("/partner/v1/tenants", &no_query())
        .await
        .unwrap();

    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-1"})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(None)
        .build();
    let client = HttpClient::with_auth(config, token_authenticator(&mock_server)).unwrap();

    for _ in 0..2 {
        let body: Value = client.get_json("/whoami/v1", &no_query()).await.unwrap();
        assert_eq!(body["id"], "p-1");
    }
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/policies/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .get_json::<Value>("/endpoint/v1/policies/missing", &no_query())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, Error::HttpStatus { status: 404, ref body } if body == "Not found"));
}

#[tokio::test]
async fn test_401_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Without an authenticator there is no token to refresh
    let client = client_for(&mock_server);
    let err = client
        .get_json::<Value>("/common/v1/alerts", &no_query())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "revoked",
            "expires_in": 3600
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(header("Authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(header("Authorization", "Bearer fresh"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": "a-3"}]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(None)
        .build();
    let client = HttpClient::with_auth(config, token_authenticator(&mock_server)).unwrap();

    let query = StringMap::from([("page".to_string(), "2".to_string())]);
    let body: Value = client.get_json("/common/v1/alerts", &query).await.unwrap();
    assert_eq!(body["items"][0]["id"], "a-3");
}

#[tokio::test]
async fn test_persistent_401_gives_up_after_one_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(None)
        .build();
    let client = HttpClient::with_auth(config, token_authenticator(&mock_server)).unwrap();

    let err = client
        .get_json::<Value>("/common/v1/alerts", &no_query())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, ref body } if body == "invalid token"));
}

#[tokio::test]
async fn test_retry_on_500() {
    let mock_server = MockServer::start().await;

    // First two calls return 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body: Value = client
        .get_json("/common/v1/alerts", &no_query())
        .await
        .unwrap();

    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_429_waits_and_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("Rate limited"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body: Value = client
        .get_json("/common/v1/alerts", &no_query())
        .await
        .unwrap();

    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_429_without_retry_after_uses_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .max_retries(1)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .rate_limit(None)
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .get_json::<Value>("/common/v1/alerts", &no_query())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after_seconds: 0 }));
}

#[tokio::test]
async fn test_server_error_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoint/v1/endpoints"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .rate_limit(None)
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let err = client
        .get_json::<Value>("/endpoint/v1/endpoints", &no_query())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_full_url_bypasses_base() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/whoami/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p-1"})))
        .mount(&mock_server)
        .await;

    // Client without base URL
    let config = HttpClientConfig::builder().rate_limit(None).build();
    let client = HttpClient::with_config(config).unwrap();

    let body: Value = client
        .get_json(&format!("{}/whoami/v1", mock_server.uri()), &no_query())
        .await
        .unwrap();
    assert_eq!(body["id"], "p-1");
}

#[tokio::test]
async fn test_resource_pages_drive_fetch_all_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/partner/v1/tenants"))
        .and(query_param("page", "1"))
        .and(query_param("pageTotal", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "t-1"}, {"id": "t-2"}],
            "pages": {"current": 1, "size": 2, "total": 2, "items": 3, "maxSize": 100}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/partner/v1/tenants"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "t-3"}],
            "pages": {"current": 2, "size": 2, "total": 2, "items": 3, "maxSize": 100}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let pages = client.pages("/partner/v1/tenants");
    let records = fetch_all_pages(&pages, &StringMap::new(), 2).await.unwrap();
    let ids: Vec<&str> = records.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["t-1", "t-2", "t-3"]);
}

#[tokio::test]
async fn test_resource_pages_fail_on_error_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "a-1"}],
            "pages": {"current": 1, "total": 2, "nextKey": "k2"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .and(query_param("page", "2"))
        .and(query_param("pageFromKey", "k2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = fetch_all_pages(&client.pages("/common/v1/alerts"), &StringMap::new(), 1)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[test]
fn test_backoff_delay_constant() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .rate_limit(None)
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.backoff_delay(0), Duration::from_millis(100));
    assert_eq!(client.backoff_delay(5), Duration::from_millis(100));
}

#[test]
fn test_backoff_delay_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .rate_limit(None)
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.backoff_delay(0), Duration::from_millis(100));
    assert_eq!(client.backoff_delay(2), Duration::from_millis(300));
}

#[test]
fn test_backoff_delay_exponential_is_capped() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .rate_limit(None)
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.backoff_delay(0), Duration::from_millis(100));
    assert_eq!(client.backoff_delay(2), Duration::from_millis(400));
    assert_eq!(client.backoff_delay(10), Duration::from_millis(500));
}

#[test]
fn test_http_client_debug_hides_token() {
    let auth = Authenticator::new(Credentials::new("id", "secret"), "http://127.0.0.1:9");
    let client = HttpClient::with_auth(HttpClientConfig::default(), auth).unwrap();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_authenticator: true"));
    assert!(!debug_str.contains("secret"));
}

#[tokio::test]
async fn test_with_rate_limiter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/common/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(Some(RateLimiterConfig::new(100, 10)))
        .build();

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.rate_limiter().is_some());

    for _ in 0..3 {
        let _: Value = client
            .get_json("/common/v1/alerts", &no_query())
            .await
            .unwrap();
    }
}

#[test]
fn test_share_rate_limiter() {
    let limited = HttpClientConfig::builder()
        .rate_limit(Some(RateLimiterConfig::new(1, 1)))
        .build();
    let parent = HttpClient::with_config(limited.clone()).unwrap();
    let child = HttpClient::with_config(limited)
        .unwrap()
        .share_rate_limiter(parent.rate_limiter().unwrap());

    assert!(child.rate_limiter().unwrap().try_acquire());
    assert!(!parent.rate_limiter().unwrap().try_acquire());

    // A client configured without a limit stays unlimited
    let unlimited = HttpClient::with_config(HttpClientConfig::builder().rate_limit(None).build())
        .unwrap()
        .share_rate_limiter(parent.rate_limiter().unwrap());
    assert!(unlimited.rate_limiter().is_none());
}
