//! HTTP API integration tests
//!
//! Users, history, health and the inter-backend redirect endpoint, driven
//! through `axum-test` against the full router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use chatrelay::backend::repository::{InMemoryRepository, MessageRepository};
use chatrelay::backend::server::build_app;
use chatrelay::backend::server::config::Repositories;
use chatrelay::backend::server::App;
use chatrelay::backend::store::MemoryStore;
use chatrelay::shared::{AppConfigBuilder, OutboundPush};
use common::fast_config;
use pretty_assertions::assert_eq;
use serde_json::json;

struct Harness {
    server: TestServer,
    app: App,
    repo: Arc<InMemoryRepository>,
}

async fn harness_with(config: AppConfigBuilder) -> Harness {
    let repo = Arc::new(InMemoryRepository::new());
    let repositories = Repositories {
        users: repo.clone(),
        messages: repo.clone(),
    };
    let config = config.advertise_addr("127.0.0.1:9").build().unwrap();
    let app = build_app(config, Arc::new(MemoryStore::new()), repositories)
        .await
        .unwrap();
    let server = TestServer::new(app.routes.clone()).unwrap();
    Harness { server, app, repo }
}

async fn harness() -> Harness {
    harness_with(fast_config()).await
}

#[tokio::test]
async fn test_create_and_get_user() {
    let h = harness().await;

    let response = h.server.post("/user").json(&json!({"username": "alice"})).await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["username"], "alice");
    let id = created["id"].as_i64().unwrap();

    let response = h.server.get(&format!("/user/{}", id)).await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>(), json!({"id": id, "username": "alice"}));
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let h = harness().await;
    h.server.post("/user").json(&json!({"username": "alice"})).await;

    let response = h.server.post("/user").json(&json!({"username": "alice"})).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_username_rejected() {
    let h = harness().await;
    let response = h.server.post("/user").json(&json!({"username": "   "})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let h = harness().await;
    let response = h.server.get("/user/404").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({"error": "user not found", "status": 404})
    );
}

#[tokio::test]
async fn test_health_reports_backend_id() {
    let h = harness().await;
    let response = h.server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend_id"], h.app.state.backend_id().as_str());
}

#[tokio::test]
async fn test_message_history() {
    let h = harness().await;
    h.repo.create_message(1, 2, "first").await.unwrap();
    h.repo.create_message(2, 1, "reply").await.unwrap();
    h.repo.create_message(1, 2, "second").await.unwrap();

    let response = h.server.get("/messages?from=1&to=2").await;
    response.assert_status_ok();
    let texts: Vec<String> = response
        .json::<Vec<serde_json::Value>>()
        .into_iter()
        .map(|m| m["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);

    let response = h
        .server
        .get("/messages?from=1&to=2&since=2999-01-01T00:00:00Z")
        .await;
    assert_eq!(response.json::<Vec<serde_json::Value>>().len(), 0);

    h.server
        .get("/messages?from=1&to=2&since=yesterday")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_redirect_enqueues_on_local_channel() {
    let h = harness().await;
    let mut receiver = h.app.state.registry.put(5);

    let response = h
        .server
        .post("/internal/redirect")
        .json(&json!({"message": "forwarded", "to_user_id": 5, "from_user_id": 3}))
        .await;
    response.assert_status_ok();

    assert_eq!(
        receiver.recv().await.unwrap(),
        OutboundPush::new("forwarded", Some(3))
    );
}

#[tokio::test]
async fn test_redirect_without_sender_tag() {
    let h = harness().await;
    let mut receiver = h.app.state.registry.put(5);

    h.server
        .post("/internal/redirect")
        .json(&json!({"message": "untagged", "to_user_id": 5}))
        .await
        .assert_status_ok();

    assert_eq!(receiver.recv().await.unwrap(), OutboundPush::new("untagged", None));
}

#[tokio::test]
async fn test_redirect_for_user_not_connected_here() {
    let h = harness().await;
    let response = h
        .server
        .post("/internal/redirect")
        .json(&json!({"message": "hi", "to_user_id": 77}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirect_to_full_queue_is_unavailable() {
    let h = harness_with(
        fast_config()
            .local_channel_capacity(1)
            .redirect_timeout(Duration::from_millis(50)),
    )
    .await;
    let _receiver = h.app.state.registry.put(5);

    h.server
        .post("/internal/redirect")
        .json(&json!({"message": "fills", "to_user_id": 5}))
        .await
        .assert_status_ok();

    h.server
        .post("/internal/redirect")
        .json(&json!({"message": "overflow", "to_user_id": 5}))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_redirect_to_closed_queue_is_unavailable() {
    let h = harness().await;
    drop(h.app.state.registry.put(5));

    h.server
        .post("/internal/redirect")
        .json(&json!({"message": "hi", "to_user_id": 5}))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_redirect_rejects_bad_bodies() {
    let h = harness().await;

    h.server
        .post("/internal/redirect")
        .text("message=hi")
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);

    h.server
        .post("/internal/redirect")
        .json(&json!({"message": 1, "to_user_id": "five"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let h = harness().await;
    h.server
        .get("/nowhere")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
