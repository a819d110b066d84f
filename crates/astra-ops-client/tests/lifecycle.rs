//! End-to-end lifecycle tests against a mock databases API.

use std::time::Duration;

use astra_ops_client::{
    ApiError, AstraClient, ClientConfig, ClientError, CreateDatabase, DatabaseId, DatabaseStatus,
    RetryPolicy,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> AstraClient {
    AstraClient::new(ClientConfig::with_base_url(server.uri()).verbose(true), TOKEN).unwrap()
}

fn db_id() -> DatabaseId {
    "db-123".parse().unwrap()
}

fn fast(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(10)).unwrap()
}

fn snapshot(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "db-123",
        "orgId": "org-1",
        "ownerId": "owner-1",
        "info": { "name": "orders", "keyspace": "shop" },
        "status": status,
    }))
}

fn errors_body(status: u16, errors: &[(i64, &str)]) -> ResponseTemplate {
    let errors: Vec<_> = errors
        .iter()
        .map(|(id, message)| json!({ "id": id, "message": message }))
        .collect();
    ResponseTemplate::new(status).set_body_json(json!({ "errors": errors }))
}

#[tokio::test]
async fn create_waits_for_active() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "name": "orders",
            "keyspace": "shop",
            "cloudProvider": "GCP",
            "tier": "serverless",
            "capacityUnits": 1,
            "region": "europe-west1",
            "user": "",
            "password": ""
        })))
        .respond_with(ResponseTemplate::new(201).insert_header("location", "db-123"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("PENDING"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("ACTIVE"))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateDatabase::new("orders", "shop", "GCP", "europe-west1", "serverless");
    let db = client(&server).create_db(&request, fast(5)).await.unwrap();

    assert_eq!(db.id, db_id());
    assert_eq!(db.status, DatabaseStatus::Active);
    assert_eq!(db.info.keyspace, "shop");
}

#[tokio::test]
async fn create_async_accepts_location_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("location", "/v2/databases/db-123"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(snapshot("ACTIVE"))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateDatabase::new("orders", "shop", "GCP", "europe-west1", "serverless");
    let id = client(&server).create_db_async(&request).await.unwrap();
    assert_eq!(id, db_id());
}

#[tokio::test]
async fn create_without_location_is_decode_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let request = CreateDatabase::new("orders", "shop", "GCP", "europe-west1", "serverless");
    let err = client(&server).create_db_async(&request).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn create_rejection_carries_structured_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases"))
        .respond_with(errors_body(
            400,
            &[(1, "bad error"), (2, "worse error")],
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(snapshot("ACTIVE"))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateDatabase::new("orders", "shop", "GCP", "europe-west1", "serverless");
    let err = client(&server)
        .create_db(&request, fast(3))
        .await
        .unwrap_err();

    match &err {
        ClientError::RemoteRejection {
            expected,
            actual,
            errors,
            detail,
        } => {
            assert_eq!(detail, &None);
            assert_eq!(expected, &vec![201]);
            assert_eq!(*actual, 400);
            assert_eq!(
                errors,
                &vec![ApiError::new(1, "bad error"), ApiError::new(2, "worse error")]
            );
        }
        other => panic!("expected RemoteRejection, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "expected status code 201 but had: 400 error with errors - \
         ID: 1 Text: 'bad error', ID: 2 Text: 'worse error'"
    );
}

#[tokio::test]
async fn terminate_succeeds_when_fetch_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/terminate"))
        .and(query_param("preparedStateOnly", "false"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .terminate(&db_id(), false, fast(30))
        .await
        .unwrap();
}

#[tokio::test]
async fn terminate_retries_other_rejections_until_terminating() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/terminate"))
        .and(query_param("preparedStateOnly", "true"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(errors_body(500, &[(9, "internal")]))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("TERMINATING"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .terminate(&db_id(), true, fast(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn terminate_uses_configured_gone_codes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/terminate"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        gone_status_codes: vec![404],
        ..ClientConfig::with_base_url(server.uri())
    };
    let client = AstraClient::new(config, TOKEN).unwrap();

    client.terminate(&db_id(), false, fast(3)).await.unwrap();
}

#[tokio::test]
async fn park_times_out_naming_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/park"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("PARKING"))
        .expect(3)
        .mount(&server)
        .await;

    let policy = RetryPolicy::from_secs(3, 1).unwrap();
    let err = client(&server).park(&db_id(), policy).await.unwrap_err();

    match err.root() {
        ClientError::ConvergenceTimeout { id, budget, .. } => {
            assert_eq!(id, &db_id());
            assert_eq!(*budget, Duration::from_secs(3));
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "park db failed: unable to find db id db-123 with status PARKED after 3s; \
         last status PARKING"
    );
}

#[tokio::test]
async fn park_rejection_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/park"))
        .respond_with(errors_body(409, &[(2000, "serverless databases cannot be parked")]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(snapshot("PARKED"))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).park(&db_id(), fast(3)).await.unwrap_err();
    assert_eq!(err.rejected_status(), Some(409));
    assert!(err
        .to_string()
        .contains("ID: 2000 Text: 'serverless databases cannot be parked'"));
}

#[tokio::test]
async fn unpark_waits_through_fetch_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/unpark"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("ACTIVE"))
        .expect(1)
        .mount(&server)
        .await;

    let db = client(&server).unpark(&db_id(), fast(3)).await.unwrap();
    assert_eq!(db.status, DatabaseStatus::Active);
}

#[tokio::test]
async fn wait_absorbs_undecodable_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("ACTIVE"))
        .expect(1)
        .mount(&server)
        .await;

    let db = client(&server)
        .wait_until(&db_id(), fast(5), DatabaseStatus::Active)
        .await
        .unwrap();
    assert_eq!(db.status, DatabaseStatus::Active);
}

#[tokio::test]
async fn terminate_aborts_on_undecodable_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/terminate"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .terminate(&db_id(), false, fast(5))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), ClientError::Decode(_)), "{err:?}");
    assert!(err.to_string().starts_with("terminate db failed: "));
}

#[tokio::test]
async fn terminate_timeout_reports_last_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/terminate"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(snapshot("ACTIVE"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server)
        .terminate(&db_id(), false, fast(2))
        .await
        .unwrap_err();
    match err.root() {
        ClientError::ConvergenceTimeout { last_status, .. } => {
            assert_eq!(*last_status, Some(DatabaseStatus::Active));
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }
    assert!(err.to_string().ends_with("; last status ACTIVE"), "{err}");
}

#[tokio::test]
async fn find_db_sends_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/json"))
        .respond_with(snapshot("MAINTENANCE"))
        .expect(1)
        .mount(&server)
        .await;

    let db = client(&server).find_db(&db_id()).await.unwrap();
    assert_eq!(db.status, DatabaseStatus::Maintenance);
    assert_eq!(db.org_id, "org-1");
}

#[tokio::test]
async fn find_db_rejection_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/databases/db-123"))
        .respond_with(ResponseTemplate::new(500).set_body_string("wrongerror"))
        .mount(&server)
        .await;

    let err = client(&server).find_db(&db_id()).await.unwrap_err();
    match err {
        ClientError::RemoteRejection {
            actual,
            ref errors,
            ref detail,
            ..
        } => {
            assert_eq!(actual, 500);
            assert!(errors.is_empty());
            let detail = detail.as_deref().unwrap();
            assert!(detail.starts_with("unable to decode error response 'wrongerror'"));
            assert!(err.to_string().contains("'wrongerror'"));
        }
        other => panic!("expected RemoteRejection, got {other:?}"),
    }
}

#[tokio::test]
async fn resize_posts_capacity_units() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/resize"))
        .and(body_json(json!({ "capacityUnits": 4 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).resize(&db_id(), 4).await.unwrap();
}

#[tokio::test]
async fn resize_expects_exactly_200() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/resize"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let err = client(&server).resize(&db_id(), 4).await.unwrap_err();
    assert_eq!(err.rejected_status(), Some(202));
}

#[tokio::test]
async fn reset_password_posts_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/resetPassword"))
        .and(body_json(json!({ "username": "admin", "password": "s3cret\"quoted" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .reset_password(&db_id(), "admin", "s3cret\"quoted")
        .await
        .unwrap();
}

#[tokio::test]
async fn add_keyspace_posts_to_keyspace_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/databases/db-123/keyspaces/audit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).add_keyspace(&db_id(), "audit").await.unwrap();
}

#[tokio::test]
async fn transport_failure_surfaces_from_dispatcher() {
    // nothing listens on port 1
    let client =
        AstraClient::new(ClientConfig::with_base_url("http://127.0.0.1:1"), TOKEN).unwrap();
    let err = client.park_async(&db_id()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
    assert!(err.is_retriable());
}
