//! REST API tests

use api::settings::Settings;
use api::{create_router, AppState, SharedState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use dms::AlertLevel;
use landmark_source::Timestamp;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn app() -> (Router, SharedState) {
    let state = Arc::new(RwLock::new(AppState::from_settings(Settings::default()).unwrap()));
    (create_router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _state) = app();
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["monitoring"]["status"], "idle");
    assert_eq!(body["components"]["history"]["detail"], "0 records");
}

#[tokio::test]
async fn test_status_before_start() {
    let (app, _state) = app();
    let (status, body) = send(&app, "GET", "/api/v1/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["level"], "safe");
    assert_eq!(body["latest"], Value::Null);
}

#[tokio::test]
async fn test_config_get_and_patch() {
    let (app, state) = app();

    let (status, body) = send(&app, "GET", "/api/v1/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monitor"]["ear_threshold"], 0.25);

    let patch = json!({"monitor": {"ear_threshold": 0.2}, "notifications": {"driver_name": "Sam"}});
    let (status, body) = send(&app, "PUT", "/api/v1/config", Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monitor"]["ear_threshold"], 0.2);
    // Untouched fields survive the merge
    assert_eq!(body["monitor"]["mar_threshold"], 0.6);

    let snapshot = state.read().await.config.snapshot();
    assert_eq!(snapshot.monitor.ear_threshold, 0.2);
    assert_eq!(snapshot.notifications.driver_name, "Sam");
}

#[tokio::test]
async fn test_config_rejects_invalid_values() {
    let (app, state) = app();

    let patch = json!({"monitor": {"head_angle_deg": 90.0}});
    let (status, body) = send(&app, "PUT", "/api/v1/config", Some(patch)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("head_angle_deg"));

    let (status, _) = send(&app, "PUT", "/api/v1/config", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was applied
    assert_eq!(state.read().await.config.snapshot().monitor.head_angle_deg, 20.0);
}

#[tokio::test]
async fn test_session_start_stop() {
    let (app, _state) = app();

    let (status, first) = send(&app, "POST", "/api/v1/session/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["running"], true);

    let (_, second) = send(&app, "POST", "/api/v1/session/start", None).await;
    assert_eq!(second["session_id"], first["session_id"]);

    let (_, status_body) = send(&app, "GET", "/api/v1/status", None).await;
    assert_eq!(status_body["running"], true);
    assert_eq!(status_body["session_id"], first["session_id"]);

    let (_, stopped) = send(&app, "POST", "/api/v1/session/stop", None).await;
    assert_eq!(stopped["running"], false);
    assert_eq!(stopped["session_id"], first["session_id"]);

    let (_, again) = send(&app, "POST", "/api/v1/session/stop", None).await;
    assert_eq!(again["session_id"], Value::Null);
}

#[tokio::test]
async fn test_history_filter_and_clear() {
    let (app, state) = app();
    {
        let state = state.read().await;
        state.history.insert(AlertLevel::Warning, "head tilted", Timestamp::from_secs_f64(1.0)).unwrap();
        state.history.insert(AlertLevel::Danger, "drowsy", Timestamp::from_secs_f64(2.0)).unwrap();
        state.history.insert(AlertLevel::Sos, "wake up", Timestamp::from_secs_f64(3.0)).unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/v1/history?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["message"], "wake up");

    let (_, body) = send(&app, "GET", "/api/v1/history?min_level=danger", None).await;
    assert_eq!(body["count"], 2);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["level"] == "danger" || r["level"] == "sos"));

    let (_, body) = send(&app, "DELETE", "/api/v1/history", None).await;
    assert_eq!(body["removed"], 3);

    let (_, body) = send(&app, "GET", "/api/v1/history", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_daily_report() {
    let (app, state) = app();
    {
        let state = state.read().await;
        for _ in 0..3 {
            state.history.insert(AlertLevel::Danger, "drowsy", Timestamp::ZERO).unwrap();
        }
        state.history.insert(AlertLevel::Warning, "eyes off road", Timestamp::ZERO).unwrap();
    }

    let today = Utc::now().date_naive();
    let (status, body) = send(&app, "GET", &format!("/api/v1/report?date={}", today), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["danger_count"], 3);
    assert_eq!(body["warning_count"], 1);
    assert_eq!(body["safety_score"], 70);

    let (_, body) = send(&app, "GET", "/api/v1/report?date=2001-01-01", None).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["safety_score"], 100);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (app, _state) = app();
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
