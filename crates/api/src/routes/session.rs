//! Session Routes

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiError, SharedState};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub running: bool,
    pub session_id: Option<Uuid>,
}

/// Start monitoring (no-op if already running)
pub async fn start(State(state): State<SharedState>) -> Result<Json<SessionResponse>, ApiError> {
    let mut state = state.write().await;
    let id = state.session.start()?;
    Ok(Json(SessionResponse {
        running: true,
        session_id: Some(id),
    }))
}

/// Stop monitoring (no-op if already stopped)
pub async fn stop(State(state): State<SharedState>) -> Json<SessionResponse> {
    let mut state = state.write().await;
    let session_id = state.session.stop();
    Json(SessionResponse {
        running: false,
        session_id,
    })
}
