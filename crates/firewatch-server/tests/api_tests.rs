//! Router tests driven through tower's `oneshot`

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use common::{app_state, config, QuietGateway};
use firewatch_core::{IncidentState, IncidentStatus, Tier};
use firewatch_server::http::IncidentListResponse;
use firewatch_server::{create_router, AppState, StartupError};

const ADMINS: &[&str] = &["+8613800000001", "+8613800000002"];

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn trigger(app: &Router, body: &str) -> IncidentStatus {
    let (status, bytes) = call(app, "POST", "/incidents", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_trigger_and_follow_incident() {
    let (state, gateway) = app_state(&config(ADMINS)).await;
    let app = create_router(state);

    let created = trigger(&app, r#"{"title":"Camera 1","description":"Open flame"}"#).await;
    assert_eq!(created.title, "Camera 1");

    tokio::time::sleep(Duration::from_secs(1)).await;
    let (status, bytes) = call(&app, "GET", &format!("/incidents/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let current: IncidentStatus = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(current.state, IncidentState::Waiting);
    assert_eq!(gateway.sends.load(Ordering::SeqCst), 1);

    // Nobody replies: the budget runs out and the incident escalates
    tokio::time::sleep(Duration::from_secs(180)).await;
    let (_, bytes) = call(&app, "GET", &format!("/incidents/{}", created.id), None).await;
    let current: IncidentStatus = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(current.state, IncidentState::TerminalEscalated);
    assert_eq!(current.tier, Tier::UrgentPhone);
    assert_eq!(gateway.raises.load(Ordering::SeqCst), 1);

    // Finished: gone from the listing, still counted and retrievable
    let (_, bytes) = call(&app, "GET", "/incidents", None).await;
    let list: IncidentListResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(list.incidents.is_empty());
    let (_, bytes) = call(&app, "GET", "/status", None).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["incidents"]["total"], 1);
    assert_eq!(body["incidents"]["finished"], 1);
    assert_eq!(body["incidents"]["active"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_uses_configured_wording() {
    let mut config = config(ADMINS);
    config.core.alert.title = "Server room smoke".into();
    let (state, _) = app_state(&config).await;
    let app = create_router(state);

    let created = trigger(&app, "{}").await;
    assert_eq!(created.title, "Server room smoke");
}

#[tokio::test(start_paused = true)]
async fn test_stand_down() {
    let (state, gateway) = app_state(&config(ADMINS)).await;
    let app = create_router(state);
    let created = trigger(&app, "{}").await;
    tokio::time::sleep(Duration::from_secs(12)).await;

    let uri = format!("/incidents/{}/stand-down", created.id);
    let (status, bytes) = call(&app, "PUT", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let (_, bytes) = call(&app, "GET", &format!("/incidents/{}", created.id), None).await;
    let current: IncidentStatus = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(current.state, IncidentState::Confirmed);
    assert_eq!(gateway.raises.load(Ordering::SeqCst), 0);

    // Already confirmed
    let (status, _) = call(&app, "PUT", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_and_malformed_ids() {
    let (state, _) = app_state(&config(ADMINS)).await;
    let app = create_router(state);

    let (status, _) = call(&app, "GET", "/incidents/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = "/incidents/6f1c2a55-8d0e-4b7a-9c3e-2f4d5a6b7c8d";
    let (status, _) = call(&app, "GET", unknown, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "PUT", &format!("{}/stand-down", unknown), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_returns_too_many_requests() {
    let mut config = config(ADMINS);
    config.core.dispatch.cooldown_secs = 60;
    let (state, _) = app_state(&config).await;
    let app = create_router(state);

    trigger(&app, "{}").await;
    let (status, bytes) = call(&app, "POST", "/incidents", Some("{}")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(String::from_utf8_lossy(&bytes).contains("cooling down"));
}

#[tokio::test(start_paused = true)]
async fn test_list_and_status() {
    let (state, _) = app_state(&config(ADMINS)).await;
    let app = create_router(state);

    let first = trigger(&app, r#"{"title":"Camera 1"}"#).await;
    trigger(&app, r#"{"title":"Camera 2"}"#).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (status, bytes) = call(&app, "GET", "/incidents", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: IncidentListResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(list.incidents.len(), 2);
    assert!(list.incidents.iter().any(|s| s.id == first.id));

    let (_, bytes) = call(&app, "GET", "/status", None).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["incidents"]["total"], 2);
    assert_eq!(body["incidents"]["active"], 2);
    assert_eq!(body["recipients"], 2);
}

#[tokio::test]
async fn test_build_fails_when_no_admin_resolves() {
    let gateway = std::sync::Arc::new(QuietGateway::default());
    let result = AppState::build(&config(&["+8613800000099"]), gateway).await;
    assert!(matches!(result, Err(StartupError::NoRecipients(1))));
}
