//! Driver Monitor API Server
//!
//! Runs the monitoring session and exposes it over REST: status, alert
//! history, daily report, live configuration and Prometheus metrics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod pipeline;
mod routes;
pub mod settings;
pub mod source;

use alerting::{Channels, LogEmailChannel, TerminalBell};
use pipeline::{MonitorSession, SessionError};
use settings::{ConfigHandle, LoggingConfig, Settings, SettingsError};
use storage::{HistoryRepository, StorageError};

/// Application state shared across handlers
pub struct AppState {
    pub session: MonitorSession,
    pub history: Arc<HistoryRepository>,
    pub config: ConfigHandle,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    /// Create new application state with the given channels
    pub fn new(config: ConfigHandle, history: Arc<HistoryRepository>, channels: Channels) -> Self {
        Self {
            session: MonitorSession::new(config.clone(), history.clone(), channels),
            history,
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    /// State with the built-in terminal bell and log email channels
    pub fn from_settings(settings: Settings) -> Result<Self, StorageError> {
        let history = Arc::new(match &settings.history.path {
            Some(path) => HistoryRepository::with_file(path, settings.history.max_records)?,
            None => HistoryRepository::with_capacity(settings.history.max_records),
        });
        let channels = Channels {
            sound: Arc::new(TerminalBell),
            email: Arc::new(LogEmailChannel),
            history: history.clone(),
        };
        Ok(Self::new(ConfigHandle::new(settings), history, channels))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidSettings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Session(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::status::health))
        .route("/api/v1/status", get(routes::status::status))
        .route(
            "/api/v1/history",
            get(routes::history::get_history).delete(routes::history::clear_history),
        )
        .route("/api/v1/report", get(routes::history::daily_report))
        .route(
            "/api/v1/config",
            get(routes::config::get_config).put(routes::config::update_config),
        )
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/stop", post(routes::session::stop))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Run the server until ctrl-c
pub async fn run_server(settings: Settings, autostart: bool) -> anyhow::Result<()> {
    let bind = settings.server.bind.clone();
    let mut state = AppState::from_settings(settings)?.with_metrics(install_metrics()?);
    if autostart {
        state.session.start()?;
    }
    let state = Arc::new(RwLock::new(state));
    let app = create_router(state.clone());

    info!("Starting API server on {}", bind);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.write().await.session.stop();
    info!("Server stopped");
    Ok(())
}
