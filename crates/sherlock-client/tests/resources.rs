//! Typed collection access against a mock backend.

use pretty_assertions::assert_eq;
use serde_json::json;
use sherlock_client::{ApiClient, Session};
use sherlock_common::entities::{LogEntry, SoftwareUpdateKind, SoftwareUpdateState};
use sherlock_common::{CategoryInfo, DataSource, SherlockError};
use sherlock_test_utils::{airport_tenant, category_project, explicit_project, json_list, AIRPORT};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ApiClient {
    let session = Session::in_memory();
    session.set_auth_token("tok").await.unwrap();
    ApiClient::new(&server.uri(), session).unwrap()
}

#[tokio::test]
async fn test_affected_edges_for_project() {
    let server = MockServer::start().await;
    let (edges, sources) = airport_tenant();
    Mock::given(method("GET"))
        .and(path("/v1/projects/p1/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_list(&sources)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/p1/edges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_list(&edges)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client
        .affected_edges_for_project("p1", &[CategoryInfo::new(AIRPORT, "LAX")], "")
        .await
        .unwrap();
    assert_eq!(result.edges.len(), 1);
    assert_eq!(result.edges[0].edge.id, "edge-lax");
    assert_eq!(result.data_source_count, 2);
    assert_eq!(result.sensor_count, 6);
}

#[tokio::test]
async fn test_project_edge_counts() {
    let server = MockServer::start().await;
    let (_, sources) = airport_tenant();
    let projects = vec![
        category_project("p1", vec![CategoryInfo::new(AIRPORT, "SFO")]),
        explicit_project("p2", &["edge-sfo", "edge-lax", "edge-idle"]),
    ];
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_list(&projects)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_list(&sources)))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let counts: Vec<(String, usize)> = client
        .project_edge_counts()
        .await
        .unwrap()
        .into_iter()
        .map(|(p, n)| (p.id, n))
        .collect();
    assert_eq!(counts, vec![("p1".to_string(), 1), ("p2".to_string(), 3)]);
}

#[tokio::test]
async fn test_null_list_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let sources: Vec<DataSource> = client.list().await.unwrap();
    assert!(sources.is_empty());
}

#[tokio::test]
async fn test_create_update_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "ds-new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/datasources/ds-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "ds-new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/datasources/ds-new"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (_, sources) = airport_tenant();
    let id = client.create(&sources[0]).await.unwrap();
    assert_eq!(id, "ds-new");
    client.update(&id, &sources[0]).await.unwrap();
    client.delete::<DataSource>(&id).await.unwrap();
}

#[tokio::test]
async fn test_unknown_raw_resource_is_rejected() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let err = client.list_raw("widgets").await.unwrap_err();
    assert!(matches!(err, SherlockError::Validation(_)));
}

#[tokio::test]
async fn test_logs_list_entries_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/logs/entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "l1", "edgeId": "e1", "batchId": "b-1", "status": "PENDING" }
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let entries: Vec<LogEntry> = client.list().await.unwrap();
    assert_eq!(entries[0].batch_id, "b-1");
    let raw = client.list_raw("logs").await.unwrap();
    assert_eq!(raw.len(), 1);
}

#[tokio::test]
async fn test_software_update_batch_and_edges() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/softwareupdates/upgrades/b-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b-7", "type": "UPGRADE", "release": "1.15.0",
            "state": "UPGRADE_FAILED", "progress": 30, "stats": { "UPGRADE_FAILED": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/softwareupdates/upgrades/b-7/servicedomains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pageIndex": 0, "pageSize": 100, "totalCount": 1,
            "result": [{ "batchId": "b-7", "svcDomainId": "edge-sfo", "release": "1.15.0",
                         "state": "UPGRADE_FAILED", "progress": 30, "failureReason": "disk full" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let batch = client.software_update_batch(SoftwareUpdateKind::Upgrade, "b-7").await.unwrap();
    assert!(batch.is_terminal());
    assert!(batch.state.is_failed());

    let edges = client.software_update_edges(SoftwareUpdateKind::Upgrade, "b-7").await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].edge_id, "edge-sfo");
    assert_eq!(edges[0].state, SoftwareUpdateState::UpgradeFailed);
    assert_eq!(edges[0].failure_reason.as_deref(), Some("disk full"));
}
