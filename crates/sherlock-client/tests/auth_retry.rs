//! Auth-retry behaviour against a mock backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use sherlock_client::{ApiClient, Credentials, Session};
use sherlock_common::{Edge, SherlockError};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn edges_body() -> serde_json::Value {
    json!([{ "id": "edge-sfo", "name": "SFO", "serialNumber": "SN-1", "connected": true }])
}

fn token_body(token: &str) -> serde_json::Value {
    json!({ "token": token, "_id": "u1", "name": "Ops", "email": "ops@example.com" })
}

async fn mount_edges(server: &MockServer, stale: &str, fresh: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .and(header("Authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .and(header("Authorization", format!("Bearer {fresh}").as_str()))
        .and(header_exists("X-Request-ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edges_body()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_401_refreshes_token_and_replays() {
    let server = MockServer::start().await;
    mount_edges(&server, "old", "new").await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.set_auth_token("old").await.unwrap();
    session.set_refresh_token("r1").await.unwrap();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();

    let edges: Vec<Edge> = client.list().await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].id, "edge-sfo");
    assert_eq!(session.auth_token().await.unwrap().as_deref(), Some("new"));
}

#[tokio::test]
async fn test_401_relogs_with_cached_credentials() {
    let server = MockServer::start().await;
    mount_edges(&server, "old", "fresh").await;
    Mock::given(method("POST"))
        .and(path("/v1/login"))
        .and(body_json(json!({ "email": "ops@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.set_auth_token("old").await.unwrap();
    session.set_credentials(&Credentials::new("ops@example.com", "pw")).await.unwrap();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();

    let edges: Vec<Edge> = client.list().await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(session.auth_token().await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_401_without_recovery_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("x")))
        .expect(0)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.set_auth_token("old").await.unwrap();
    let client = ApiClient::new(&server.uri(), session.clone())
        .unwrap()
        .with_return_url("/edges");

    let err = client.list::<Edge>().await.unwrap_err();
    match err {
        SherlockError::LoginRequired { return_url } => assert_eq!(return_url, "/edges"),
        other => panic!("expected LoginRequired, got {other:?}"),
    }
    assert!(session.auth_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_refresh_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.set_auth_token("old").await.unwrap();
    session.set_refresh_token("r1").await.unwrap();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();

    let err = client.list::<Edge>().await.unwrap_err();
    assert!(err.is_login_required());
    assert!(session.auth_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_401_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.set_auth_token("old").await.unwrap();
    session.set_refresh_token("r1").await.unwrap();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();

    let err = client.list::<Edge>().await.unwrap_err();
    assert!(err.is_login_required());
    assert!(session.auth_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_goes_to_hook_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/edges"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "database unavailable" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let session = Session::in_memory();
    session.set_auth_token("tok").await.unwrap();
    let client = ApiClient::new(&server.uri(), session)
        .unwrap()
        .with_error_hook(Arc::new(move |err: &SherlockError| {
            assert_eq!(err.status(), Some(500));
            seen.fetch_add(1, Ordering::SeqCst);
        }));

    let err = client.list::<Edge>().await.unwrap_err();
    match err {
        SherlockError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_remembers_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("t1")))
        .expect(2)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();

    client.login("ops@example.com", "pw", false).await.unwrap();
    assert_eq!(session.auth_token().await.unwrap().as_deref(), Some("t1"));
    assert!(session.credentials().await.unwrap().is_none());

    client.login("ops@example.com", "pw", true).await.unwrap();
    let creds = session.credentials().await.unwrap().unwrap();
    assert_eq!(creds.email, "ops@example.com");
}

#[tokio::test]
async fn test_rejected_login_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "invalid credentials" })),
        )
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();
    let err = client.login("ops@example.com", "wrong", true).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(session.auth_token().await.unwrap().is_none());
    assert!(session.credentials().await.unwrap().is_none());
}

#[tokio::test]
async fn test_exchange_code_records_sso_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .and(body_json(json!({ "code": "abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "sso-token",
            "_id": "u2",
            "name": "SSO User",
            "email": "sso@nutanix.com",
            "refreshToken": "r9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let client = ApiClient::new(&server.uri(), session.clone()).unwrap();
    client.exchange_code("abc").await.unwrap();

    assert_eq!(session.auth_token().await.unwrap().as_deref(), Some("sso-token"));
    assert_eq!(session.refresh_token().await.unwrap().as_deref(), Some("r9"));
    assert_eq!(session.display_name().await.unwrap().as_deref(), Some("sso@nutanix.com"));
}
