mod common;

use axum::http::{header, StatusCode};
use common::*;
use mesos2iam_daemon::app::get_app;
use mesos2iam_daemon::backend::CredentialsBackend;
use mesos2iam_daemon::server::ProxyServer;
use mesos2iam_daemon::state::ProxyState;
use mesos2iam_identity::IdentityResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

#[tokio::test]
async fn test_host_mode_caller_gets_its_job_credentials() {
    let backend = FakeBackend::start(&[(JOB_ID, CREDENTIALS)]).await;
    let app = proxy(
        HOST_IP,
        process_tree(800, 799),
        vec![
            tagged(1, None, "9b0e7a5f-0d3c-4d39-8b4e-0b0f6c1b1f3a"),
            tagged(799, None, JOB_ID),
        ],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("52.52.52.52:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_string(response).await, CREDENTIALS);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_bridge_mode_caller_gets_its_job_credentials() {
    let backend = FakeBackend::start(&[(JOB_ID, CREDENTIALS)]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![
            tagged(5, Some("172.17.0.3"), "9b0e7a5f-0d3c-4d39-8b4e-0b0f6c1b1f3a"),
            tagged(6, Some("172.17.0.2"), JOB_ID),
        ],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.2:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, CREDENTIALS);
}

#[tokio::test]
async fn test_invalid_job_id_is_rejected_before_the_backend() {
    let backend = FakeBackend::start(&[(JOB_ID, CREDENTIALS)]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![tagged(6, Some("172.17.0.2"), "invalidJobid")],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.2:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "Invalid JobId in http request: invalidJobid"
    );
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_caller_gets_generic_bad_request() {
    let backend = FakeBackend::start(&[(JOB_ID, CREDENTIALS)]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![tagged(6, Some("172.17.0.2"), JOB_ID)],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.9:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "Error getting JobId from http request: identity not found"
    );
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_container_without_job_id_gets_generic_bad_request() {
    let backend = FakeBackend::start(&[]).await;
    let app = proxy(
        HOST_IP,
        process_tree(800, 799),
        vec![container(799, None, &["PATH=/usr/bin"])],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("52.52.52.52:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_backend_rejection_is_internal_error() {
    let backend = FakeBackend::start(&[]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![tagged(6, Some("172.17.0.2"), JOB_ID)],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.2:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_string(response).await,
        "Couldn't get credentials from backend: credentials backend answered 404 Not Found"
    );
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_is_internal_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![tagged(6, Some("172.17.0.2"), JOB_ID)],
        &dead,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.2:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert_eq!(
        body,
        "Couldn't get credentials from backend: credentials backend unreachable"
    );
    assert!(!body.contains("127.0.0.1"));
}

#[tokio::test]
async fn test_non_json_backend_payload_is_relayed_verbatim() {
    let backend = FakeBackend::start(&[(JOB_ID, "not credentials")]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![tagged(6, Some("172.17.0.2"), JOB_ID)],
        &backend.url,
    );

    let response = app
        .oneshot(credentials_request("172.17.0.2:10000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "not credentials");
}

#[tokio::test]
async fn test_each_caller_gets_its_own_job() {
    let other_job = uuid::Uuid::new_v4().to_string();
    let other_body = r#"{"RoleArn":"other"}"#;
    let backend =
        FakeBackend::start(&[(JOB_ID, CREDENTIALS), (other_job.as_str(), other_body)]).await;
    let app = proxy(
        HOST_IP,
        no_process_lookups(),
        vec![
            tagged(5, Some("172.17.0.3"), &other_job),
            tagged(6, Some("172.17.0.2"), JOB_ID),
        ],
        &backend.url,
    );

    let (first, second) = tokio::join!(
        app.clone().oneshot(credentials_request("172.17.0.2:10000")),
        app.clone().oneshot(credentials_request("172.17.0.3:10000")),
    );

    assert_eq!(body_string(first.unwrap()).await, CREDENTIALS);
    assert_eq!(body_string(second.unwrap()).await, other_body);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_served_over_loopback() {
    let backend = FakeBackend::start(&[(JOB_ID, CREDENTIALS)]).await;

    // loopback callers are host-mode callers when the host address is 127.0.0.1
    let (lookup, tree) = process_tree(800, 799);
    let resolver = IdentityResolver::builder()
        .host_ip("127.0.0.1".parse().unwrap())
        .job_id_prefix("TARDIS_SCHID")
        .port_owners(Arc::new(lookup))
        .processes(Arc::new(tree))
        .inventory(inventory_of(vec![tagged(799, None, JOB_ID)]))
        .build();
    let credentials_backend =
        CredentialsBackend::new(&backend.url, Duration::from_secs(5)).unwrap();
    let app = get_app(ProxyState::new(resolver, credentials_backend));

    let server = ProxyServer::bind("127.0.0.1:0".parse().unwrap(), app)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let token = CancellationToken::new();
    let handle = tokio::spawn(server.run(token.clone()));

    let response = reqwest::get(format!("http://{addr}/v2/credentials"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), CREDENTIALS);

    let response = reqwest::get(format!("http://{addr}/latest/meta-data"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    token.cancel();
    handle.await.unwrap().unwrap();
}
