//! Health and Status Routes

use axum::{extract::State, Json};
use serde::Serialize;

use crate::pipeline::SessionStatus;
use crate::SharedState;
use dms::AlertLevel;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub monitoring: ComponentHealth,
    pub history: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: String,
}

/// Health check handler
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let monitoring = if state.session.is_running() {
        ComponentHealth {
            status: "ok".to_string(),
            detail: "running".to_string(),
        }
    } else {
        ComponentHealth {
            status: "idle".to_string(),
            detail: "no active session".to_string(),
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            monitoring,
            history: ComponentHealth {
                status: "ok".to_string(),
                detail: format!("{} records", state.history.count()),
            },
        },
    })
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub level: AlertLevel,
    #[serde(flatten)]
    pub session: SessionStatus,
}

/// Current session and alert state
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let state = state.read().await;
    let session = state.session.status();
    Json(StatusResponse {
        level: session.latest.as_ref().map_or(AlertLevel::Safe, |e| e.level),
        session,
    })
}
