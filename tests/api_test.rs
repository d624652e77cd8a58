// Integration tests for the island value HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use island_value::api::{create_router, AppState};
use island_value::command::ValueCommand;
use island_value::config::ServiceConfig;
use island_value::display::DisplayBoard;
use island_value::provider::{FeedDocument, FeedProvider, ProviderStatus};
use island_value::presence::PresenceRegistry;
use island_value::service::WorthService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ISLAND: &str = "00000000-0000-0000-0000-00000000000a";
const OBSERVER: &str = "00000000-0000-0000-0000-000000000001";

struct TestApp {
    router: Router,
    service: Arc<WorthService>,
    board: Arc<DisplayBoard>,
}

fn feed() -> FeedProvider {
    let doc: FeedDocument = serde_json::from_value(json!({
        "schema_version": 1,
        "block_values": { "DIAMOND_BLOCK": "300" },
        "islands": [{
            "id": ISLAND,
            "owner": "Steve",
            "worth": "1000",
            "region": { "world": "skyblock", "min_x": 0.0, "min_z": 0.0, "max_x": 100.0, "max_z": 100.0 },
            "homes": [{ "world": "skyblock", "x": 50.0, "y": 64.0, "z": 50.0 }],
            "block_counts": { "DIAMOND_BLOCK": 3 }
        }]
    }))
    .unwrap();
    FeedProvider::from_document(doc)
}

fn create_test_app_with(feed: FeedProvider) -> TestApp {
    let feed = Arc::new(feed);
    let presence = Arc::new(PresenceRegistry::new());
    let board = Arc::new(DisplayBoard::new());
    let service = Arc::new(WorthService::new(
        feed.clone(),
        presence.clone(),
        board.clone(),
        ServiceConfig::default(),
    ));
    let command = Arc::new(ValueCommand::new(Arc::clone(&service), presence.clone()));

    let router = create_router(AppState {
        service: Arc::clone(&service),
        feed,
        presence,
        board: board.clone(),
        command,
    });

    TestApp {
        router,
        service,
        board,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(feed())
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn observer_body() -> Value {
    json!({
        "name": "Steve",
        "location": { "world": "skyblock", "x": 10.0, "y": 65.0, "z": 10.0 }
    })
}

/// Uncached islands are 404 until an observer triggers a refresh.
#[tokio::test]
async fn test_worth_served_from_cache_only() {
    let app = create_test_app();
    let uri = format!("/api/islands/{}/worth", ISLAND);

    let response = app
        .router
        .clone()
        .oneshot(request("GET", &uri, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &format!("/api/observers/{}", OBSERVER), Some(observer_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    app.service.tick_viewers();
    app.service.refresh_active_islands(Utc::now());
    assert_eq!(app.board.len(), 1);

    let response = app.router.oneshot(request("GET", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot = json_body(response).await;
    assert_eq!(snapshot["owner_name"], "Steve");
    assert_eq!(snapshot["total_worth"], "1000");
    assert_eq!(snapshot["version"], 1);
    assert_eq!(snapshot["top_lines"][0]["key"], "DIAMOND_BLOCK");
    assert_eq!(snapshot["top_lines"][0]["amount"], 3);
}

/// Malformed ids are rejected.
#[tokio::test]
async fn test_invalid_island_id_returns_400() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(request("GET", "/api/islands/not-a-uuid/worth", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));
}

/// PUT /api/islands replaces the record and marks the island dirty.
#[tokio::test]
async fn test_upsert_island_marks_dirty() {
    let app = create_test_app();

    let record = json!({ "id": ISLAND, "owner": "Steve", "worth": "2000" });
    let response = app
        .router
        .oneshot(request("PUT", "/api/islands", Some(record)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.service.cache().is_dirty(&ISLAND.parse().unwrap()));
}

/// Ingestion is refused when the feed is unavailable.
#[tokio::test]
async fn test_upsert_island_unavailable_returns_503() {
    let app = create_test_app_with(FeedProvider::unavailable(ProviderStatus::Absent));

    let record = json!({ "id": ISLAND, "owner": "Steve", "worth": "2000" });
    let response = app
        .router
        .oneshot(request("PUT", "/api/islands", Some(record)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// PUT /api/block-values changes unit worths and marks cached islands dirty.
#[tokio::test]
async fn test_block_values_update_marks_cached_islands_dirty() {
    let app = create_test_app();
    let island = ISLAND.parse().unwrap();
    let snapshot = app.service.build_snapshot(island, Utc::now());
    assert!(snapshot.is_some());
    app.service
        .cache()
        .refresh_if_needed(island, Utc::now(), || snapshot);
    assert!(!app.service.cache().is_dirty(&island));

    let response = app
        .router
        .clone()
        .oneshot(request(
            "PUT",
            "/api/block-values",
            Some(json!({ "DIAMOND_BLOCK": "100", "GOLD_BLOCK:1": "25" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.service.cache().is_dirty(&island));

    let rebuilt = app.service.build_snapshot(island, Utc::now()).unwrap();
    assert_eq!(rebuilt.top_lines[0].worth_each().to_string(), "100");

    let response = app
        .router
        .oneshot(request("PUT", "/api/block-values", Some(json!({ " ": "1" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Unit worths cannot be changed while the feed is unavailable.
#[tokio::test]
async fn test_block_values_unavailable_returns_503() {
    let app = create_test_app_with(FeedProvider::unavailable(ProviderStatus::Absent));

    let response = app
        .router
        .oneshot(request(
            "PUT",
            "/api/block-values",
            Some(json!({ "DIAMOND_BLOCK": "100" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Worth events are accepted, anything else is ignored.
#[tokio::test]
async fn test_event_ingestion() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/events",
            Some(json!({ "event": "IslandWorthCalculatedEvent", "island": { "id": ISLAND } })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["island_id"], ISLAND);

    let response = app
        .router
        .oneshot(request(
            "POST",
            "/api/events",
            Some(json!({ "event": "PlayerJoinEvent", "island": ISLAND })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

/// Join, move and leave.
#[tokio::test]
async fn test_observer_lifecycle() {
    let app = create_test_app();
    let uri = format!("/api/observers/{}", OBSERVER);

    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &uri, Some(observer_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(request("PUT", &uri, Some(observer_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.service.tick_viewers();
    assert_eq!(app.board.len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", &uri, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.board.is_empty());

    let response = app.router.oneshot(request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Command runs with the configured label by default.
#[tokio::test]
async fn test_command_and_completion() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/api/command", Some(json!({ "args": [] }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["lines"][0], "Usage: /isvalue info");

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/command",
            Some(json!({ "label": "iv", "args": ["Steve"] })),
        ))
        .await
        .unwrap();
    let lines = json_body(response).await["lines"].clone();
    assert_eq!(lines[0], "Island value for Steve: 1000");
    assert_eq!(lines[2], "  1) ★ DIAMOND_BLOCK x3 @ 300 = 900");

    let response = app
        .router
        .oneshot(request(
            "POST",
            "/api/command/complete",
            Some(json!({ "args": ["i"] })),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["suggestions"], json!(["info"]));
}

/// Telemetry reports provider status and counters.
#[tokio::test]
async fn test_telemetry() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(request("GET", "/api/telemetry", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["provider"], "available");
    assert_eq!(body["available"], true);
    assert_eq!(body["cached_islands"], 0);
    assert_eq!(body["metrics"]["refreshes"], 0);
    // Reporter has not run yet
    assert!(body["last_sample"].is_null());
}

/// Telemetry carries the reporter's most recent sample once started.
#[tokio::test]
async fn test_telemetry_includes_last_availability_sample() {
    let app = create_test_app();
    app.service.start().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/telemetry", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["last_sample"]["available"], true);
    assert!(body["last_sample"]["timestamp"].is_string());

    app.service.shutdown().await;
}
