use super::{app_router, AppState};
use crate::settings::JsonSettings;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use svcdeck_core::adapter::{MemoryAdapter, MemoryService};
use svcdeck_core::{
    ControlSettings, InMemorySettings, PollPolicy, ServiceManager, ServiceStatus, StaticPrivilege,
};
use tower::ServiceExt;

const TOKEN: &str = "test-token-0123456789";

fn fast_host() -> MemoryAdapter {
    MemoryAdapter::new()
        .with_service(MemoryService::new("postgresql-x64-16", ServiceStatus::Running))
        .with_service(MemoryService::new("MySQL80", ServiceStatus::Stopped))
        .with_service(MemoryService::new("Redis", ServiceStatus::Running))
        .with_service(MemoryService::new("Spooler", ServiceStatus::Running))
        .with_poll_policy(PollPolicy {
            timeout: Duration::from_secs(2),
            interval: Duration::from_millis(5),
        })
}

fn router(elevated: bool, token: Option<&str>) -> Router {
    router_with_settings(elevated, token, Arc::new(InMemorySettings::default()))
}

fn router_with_settings(
    elevated: bool,
    token: Option<&str>,
    settings: Arc<dyn ControlSettings>,
) -> Router {
    let manager = ServiceManager::new(
        Arc::new(fast_host()),
        settings,
        Arc::new(StaticPrivilege(elevated)),
    );
    let state = AppState {
        manager: Arc::new(manager),
        api_token: token.map(str::to_string),
    };
    app_router(state, Vec::new())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_ok_without_auth() {
    let app = router(true, Some(TOKEN));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn services_require_token() {
    let app = router(true, Some(TOKEN));
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/services")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn list_filters_by_category() {
    let app = router(true, None);
    let (status, body) = call(&app, Method::GET, "/services?category=cache", None).await;
    assert_eq!(status, StatusCode::OK);
    let services = body.as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["name"], "Redis");
    assert_eq!(services[0]["type"], "redis");
}

#[tokio::test]
async fn start_returns_new_status() {
    let app = router(true, None);
    let (status, body) = call(&app, Method::POST, "/services/MySQL80/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "MySQL80");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn errors_map_to_http_statuses() {
    let app = router(true, None);
    let (status, body) = call(&app, Method::POST, "/services/nope/stop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "service_not_found");
    assert_eq!(body["service"], "nope");

    let (status, body) = call(&app, Method::POST, "/services/Redis/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state");
    assert_eq!(body["conflict"], "already_running");
}

#[tokio::test]
async fn unelevated_mutations_are_forbidden() {
    let app = router(false, None);
    let (status, body) = call(&app, Method::POST, "/services/Redis/disable", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");

    let (status, body) = call(&app, Method::GET, "/services/Redis/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn control_switch_round_trip() {
    let app = router(true, None);
    let (status, body) = call(&app, Method::GET, "/control", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["is_elevated"], true);
    assert_eq!(body["can_control_services"], true);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/control",
        Some(serde_json::json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["can_control_services"], false);

    let (status, body) = call(&app, Method::GET, "/services", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflict"], "control_disabled");

    let (status, body) = call(&app, Method::POST, "/control/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
}

#[tokio::test]
async fn refresh_returns_detected_services() {
    let app = router(true, None);
    let (status, body) = call(&app, Method::POST, "/services/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert!(names.contains(&"postgresql-x64-16"));
    assert!(!names.contains(&"Spooler"));
}

#[tokio::test]
async fn control_switch_is_persisted_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let settings = Arc::new(JsonSettings::open(dir.path()).unwrap());
    let app = router_with_settings(true, None, settings.clone());

    let (status, body) = call(
        &app,
        Method::PUT,
        "/control",
        Some(serde_json::json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert!(!settings.service_control_enabled());
    let reopened = JsonSettings::open(dir.path()).unwrap();
    assert!(!reopened.service_control_enabled());

    let (status, body) = call(&app, Method::POST, "/control/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert!(JsonSettings::open(dir.path()).unwrap().service_control_enabled());
}
