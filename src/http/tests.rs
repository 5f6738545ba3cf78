//! Tests for the HTTP transport and retry loop

use super::*;
use crate::config::ConnectorConfig;
use crate::error::Error;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig::from_json(serde_json::json!({
        "login_url": server.uri(),
        "auth": {"method": "token", "username": "jane@example.com", "token": "abc"},
        "profile_source": "shopify",
        "retry_limit": 2,
        "retry_initial_wait_sec": 0,
        "max_retry_wait_sec": 1,
    }))
    .unwrap()
}

/// Every mocked response carries the rate header the transport requires.
fn ok_json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("x-rate-limit", "6000")
        .set_body_json(body)
}

fn error_json(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("x-rate-limit", "6000")
        .set_body_json(body)
}

#[tokio::test]
async fn test_send_once_returns_body_and_initializes_limiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/organizations"))
        .respond_with(ok_json(serde_json::json!({"organizations": []})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    assert!(!client.rate_limiter().is_initialized());

    let body = client
        .send_once(&format!("{}/api/v2/organizations", server.uri()))
        .await
        .unwrap();

    assert!(body.contains("organizations"));
    assert!(client.rate_limiter().is_initialized());
    assert_eq!(client.rate_limiter().permits_per_second(), Some(100.0));
}

#[tokio::test]
async fn test_send_once_applies_auth_and_content_type() {
    let server = MockServer::start().await;
    let credential = AuthHeader::for_token("jane@example.com", "abc");
    Mock::given(method("GET"))
        .and(path("/api/v2/users.json"))
        .and(header("Authorization", credential.as_str()))
        .and(header("Content-Type", "application/json"))
        .and(query_param("per_page", "1"))
        .respond_with(ok_json(serde_json::json!({"users": []})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let url = format!("{}/api/v2/users.json?per_page=1", server.uri());
    client.send_once(&url).await.unwrap();
}

#[tokio::test]
async fn test_send_once_sends_marketplace_triple() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/organizations"))
        .and(header("X-Zendesk-Marketplace-Name", "acme-sync"))
        .and(header("X-Zendesk-Marketplace-App-Id", "42"))
        .and(header("X-Zendesk-Marketplace-Organization-Id", "7"))
        .respond_with(ok_json(serde_json::json!({"organizations": []})))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.marketplace_integration_name = Some("acme-sync".into());
    config.marketplace_app_id = Some("42".into());
    config.marketplace_org_id = Some("7".into());

    let client = ApiClient::new(config).unwrap();
    client
        .send_once(&format!("{}/api/v2/organizations", server.uri()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_once_missing_rate_header_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let err = client.send_once(&server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitHeader { .. }));
}

#[tokio::test]
async fn test_send_once_extracts_error_summary_and_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            error_json(429, serde_json::json!({"error": "RateLimited", "description": "slow down"}))
                .insert_header("Retry-After", "17"),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let err = client.send_once(&server.uri()).await.unwrap_err();
    let Error::Api {
        status,
        message,
        retry_after,
    } = err
    else {
        panic!("expected API error, got {err:?}");
    };
    assert_eq!(status, 429);
    assert_eq!(retry_after, Some(17));
    assert!(message.contains("RateLimited"));
    assert!(message.contains("slow down"));
}

#[tokio::test]
async fn test_fetch_with_retry_recovers_from_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/organizations"))
        .respond_with(error_json(503, serde_json::json!({"error": "down"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/organizations"))
        .respond_with(ok_json(serde_json::json!({"organizations": [{"id": 1}]})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let body = client
        .fetch_with_retry(&format!("{}/api/v2/organizations", server.uri()))
        .await
        .unwrap();
    assert!(body.unwrap().contains("organizations"));
}

#[tokio::test]
async fn test_fetch_with_retry_gives_up_after_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(error_json(500, serde_json::json!({"error": "boom"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let err = client.fetch_with_retry(&server.uri()).await.unwrap_err();
    let Error::GiveUp { retries, message } = err else {
        panic!("expected give-up, got {err:?}");
    };
    assert_eq!(retries, 2);
    assert!(message.contains("500"));
}

#[tokio::test]
async fn test_fetch_with_retry_benign_empty_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(error_json(
            422,
            serde_json::json!({"description": "Too recent start_time. Use a start_time older than 1 minute"}),
        ))
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let body = client.fetch_with_retry(&server.uri()).await.unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn test_fetch_with_retry_fatal_is_immediate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(error_json(403, serde_json::json!({"error": "Forbidden"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(config_for(&server)).unwrap();
    let err = client.fetch_with_retry(&server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_fetch_with_retry_connection_failure_is_retried_then_gives_up() {
    // A port nobody is listening on: every attempt fails at transport level
    let config = ConnectorConfig::from_json(serde_json::json!({
        "login_url": "http://127.0.0.1:9",
        "auth": {"method": "oauth", "access_token": "tok"},
        "retry_limit": 1,
        "retry_initial_wait_sec": 0,
        "max_retry_wait_sec": 1,
    }))
    .unwrap();

    let client = ApiClient::new(config).unwrap();
    let err = client
        .fetch_with_retry("http://127.0.0.1:9/api/v2/organizations")
        .await
        .unwrap_err();
    let Error::GiveUp { message, .. } = err else {
        panic!("expected give-up, got {err:?}");
    };
    assert!(message.contains("status -1"));
}

/// Helper reproducing the token-scheme Authorization value for matching.
struct AuthHeader(String);

impl AuthHeader {
    fn for_token(username: &str, token: &str) -> Self {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        Self(format!(
            "Basic {}",
            STANDARD.encode(format!("{username}/token:{token}"))
        ))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}
