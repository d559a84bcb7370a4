//! History Routes

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiError, SharedState};
use dms::AlertLevel;
use storage::{DailyReport, HistoryRecord, DEFAULT_RECENT_LIMIT};

/// Query parameters for history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Only records at or above this level
    pub min_level: Option<AlertLevel>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

/// Response for history endpoint
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<HistoryRecord>,
    pub count: usize,
}

/// Get recent history, newest first
pub async fn get_history(
    State(state): State<SharedState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let state = state.read().await;
    let limit = params.limit.min(500);

    let data = match params.min_level {
        Some(level) => state.history.recent_at_least(level, limit)?,
        None => state.history.recent(limit)?,
    };

    Ok(Json(HistoryResponse {
        count: data.len(),
        data,
    }))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Delete all history
pub async fn clear_history(State(state): State<SharedState>) -> Result<Json<ClearResponse>, ApiError> {
    let state = state.read().await;
    let removed = state.history.clear()?;
    Ok(Json(ClearResponse { removed }))
}

/// Query parameters for report endpoint
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Day to report on (UTC), today by default
    pub date: Option<NaiveDate>,
}

/// Daily safety report
pub async fn daily_report(
    State(state): State<SharedState>,
    Query(params): Query<ReportQuery>,
) -> Result<Json<DailyReport>, ApiError> {
    let state = state.read().await;
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.history.daily_report(date)?))
}
