#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netdiag_api::{ApiClient, Error, ResponseInterceptor};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

#[derive(Default)]
struct CountingInterceptor {
    calls: AtomicUsize,
}

impl ResponseInterceptor for CountingInterceptor {
    fn on_unauthorized(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "host": "https://192.168.1.1",
            "username": "admin",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc123",
            "host": "https://192.168.1.1",
            "site": "default",
            "username": "admin",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let resp = client
        .login("https://192.168.1.1", "admin", &secret("secret"), None)
        .await
        .unwrap();

    assert_eq!(resp.bearer(), Some("abc123"));
    assert_eq!(resp.expires_in, Some(3600));
    assert!(
        !client.credential().is_present(),
        "login must not store the token by itself"
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad creds"})))
        .mount(&server)
        .await;

    let result = client
        .login("https://192.168.1.1", "admin", &secret("wrong"), None)
        .await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_without_token_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "admin"})))
        .mount(&server)
        .await;

    let result = client
        .login("https://192.168.1.1", "admin", &secret("secret"), Some("default"))
        .await;

    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/status"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authenticated": true,
            "username": "admin"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.credential().set(secret("abc123"));
    let status = client.auth_status().await.unwrap();

    assert!(status.authenticated);
    assert_eq!(status.username.as_deref(), Some("admin"));
}

// ── 401 interceptor tests ───────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_clears_credential_and_notifies_once() {
    let (server, client) = setup().await;
    let interceptor = Arc::new(CountingInterceptor::default());
    client.set_interceptor(interceptor.clone());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    client.credential().set(secret("abc123"));

    let first = client.analysis_status("job-1").await;
    assert!(matches!(first, Err(Error::Unauthorized)));
    assert!(!client.credential().is_present());
    assert_eq!(interceptor.calls.load(Ordering::SeqCst), 1);

    // A late 401 with no token held must not re-trigger teardown.
    let second = client.analysis_status("job-1").await;
    assert!(matches!(second, Err(Error::Unauthorized)));
    assert_eq!(interceptor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_unauthorized_keeps_newer_credential() {
    let (server, client) = setup().await;
    let interceptor = Arc::new(CountingInterceptor::default());
    client.set_interceptor(interceptor.clone());

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    client.credential().set(secret("old"));

    // The request goes out with the old token; a re-login lands before
    // its 401 comes back.
    let stale = client.analysis_status("job-1");
    let relogin = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.credential().set(secret("new"));
    };
    let (result, ()) = tokio::join!(stale, relogin);

    assert!(matches!(result, Err(Error::Unauthorized)));
    assert_eq!(client.credential().get().unwrap().expose_secret(), "new");
    assert_eq!(interceptor.calls.load(Ordering::SeqCst), 0);
}

// ── Error classification tests ──────────────────────────────────────

#[tokio::test]
async fn test_server_error_carries_body_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/analysis/results/job-9"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "analysis crashed"})))
        .mount(&server)
        .await;

    match client.analysis_results("job-9").await {
        Err(Error::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "analysis crashed");
        }
        other => panic!("expected Server error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_falls_back_to_status_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/analysis/status/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    match client.analysis_status("missing").await {
        Err(Error::Client { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("expected Client error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_error_is_not_unauthorized() {
    // Nothing listens on this port.
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
    );
    client.credential().set(secret("abc123"));

    let err = client.auth_status().await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got: {err:?}");
    assert!(!err.is_unauthorized());
    assert!(client.credential().is_present());
}

// ── Endpoint shape tests ────────────────────────────────────────────

#[tokio::test]
async fn test_discover_passes_subnet() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/discover"))
        .and(query_param("subnet", "192.168.1.0/24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [{ "ip": "192.168.1.1", "hostname": "udm" }],
            "scan_duration_ms": 1500
        })))
        .mount(&server)
        .await;

    let resp = client.discover(Some("192.168.1.0/24")).await.unwrap();

    assert_eq!(resp.devices.len(), 1);
    assert_eq!(resp.devices[0]["ip"], "192.168.1.1");
    assert_eq!(resp.scan_duration_ms, 1500);
}

#[tokio::test]
async fn test_apply_sends_ids_and_dry_run() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/repair/apply"))
        .and(query_param("job_id", "job-1"))
        .and(body_json(json!({ "recommendation_ids": [0, 2], "dry_run": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "recommendation_index": 0, "status": "dry_run" },
                { "recommendation_index": 2, "status": "dry_run" }
            ],
            "summary": { "applied": 2, "failed": 0, "skipped": 0, "dry_run": true }
        })))
        .mount(&server)
        .await;

    let resp = client.apply_changes("job-1", &[0, 2], true).await.unwrap();

    assert_eq!(resp.results.len(), 2);
    assert_eq!(resp.summary.unwrap().dry_run, Some(true));
}

#[tokio::test]
async fn test_revert_change() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/repair/revert"))
        .and(body_json(json!({ "change_id": "chg-1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "reverted": true, "change_id": "chg-1" })),
        )
        .mount(&server)
        .await;

    let resp = client.revert_change("chg-1").await.unwrap();

    assert!(resp.reverted);
    assert_eq!(resp.change_id.as_deref(), Some("chg-1"));
}
