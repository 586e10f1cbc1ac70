//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use keystore_cache::{api::create_router, AppState, Cache, MockDb};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_state(db: MockDb, timeout: Duration) -> AppState {
    let cache = Cache::new(db, 100).unwrap();
    AppState::new(cache, timeout)
}

fn create_test_app() -> (Router, AppState) {
    let state = create_state(
        MockDb::new(Duration::ZERO).with_entry("user:1", "alice"),
        Duration::from_secs(1),
    );
    (create_router(state.clone()), state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/get/user:1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "user:1");
    assert_eq!(json["value"], "alice");
}

#[tokio::test]
async fn test_get_endpoint_second_request_is_hit() {
    let (app, state) = create_test_app();

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/get/user:1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.cache.store().calls("user:1"), 1);

    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["loads"], 1);
    assert_eq!(json["total_entries"], 1);
}

#[tokio::test]
async fn test_get_endpoint_load_failure() {
    let db = MockDb::new(Duration::ZERO).strict();
    let app = create_router(create_state(db, Duration::from_secs(1)));

    let response = app.oneshot(get("/get/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_get_endpoint_timeout() {
    let db = MockDb::new(Duration::from_millis(300));
    let app = create_router(create_state(db, Duration::from_millis(10)));

    let response = app.oneshot(get("/get/slow")).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_get_endpoint_key_too_long() {
    let (app, _) = create_test_app();
    let uri = format!("/get/{}", "k".repeat(300));

    let response = app.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_endpoint_empty_key() {
    let (app, state) = create_test_app();

    let response = app.oneshot(get("/get/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("empty"));
    assert_eq!(state.cache.store().total_calls(), 0);
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/set")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_initial() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 0);
    assert_eq!(json["misses"], 0);
    assert_eq!(json["evictions"], 0);
    assert_eq!(json["capacity"], 100);
    assert_eq!(json["in_flight"], 0);
    assert_eq!(json["hit_rate"], 0.0);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Real Socket ==

#[tokio::test]
async fn test_served_over_tcp() {
    let (app, _) = create_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let json: Value = reqwest::get(format!("http://{}/get/user:1", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["value"], "alice");

    server.abort();
}
