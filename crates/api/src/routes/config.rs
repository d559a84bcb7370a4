//! Configuration Routes

use axum::{extract::State, Json};

use crate::settings::Settings;
use crate::{ApiError, SharedState};

/// Current settings snapshot
pub async fn get_config(State(state): State<SharedState>) -> Json<Settings> {
    let state = state.read().await;
    Json((*state.config.snapshot()).clone())
}

/// Merge a partial settings document and publish it. Monitor and
/// notification changes apply from the next frame; source changes from the
/// next session.
pub async fn update_config(
    State(state): State<SharedState>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Settings>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::BadRequest("expected a JSON object".to_string()));
    }

    let state = state.read().await;
    let merged = state.config.snapshot().merged(patch)?;
    let applied = state.config.replace(merged)?;
    Ok(Json((*applied).clone()))
}
