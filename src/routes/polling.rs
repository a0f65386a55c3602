use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::{ApiError, AppState, PollerStatus};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/sensor-polling/status", get(status))
        .route("/api/sensor-polling/start", post(start))
        .route("/api/sensor-polling/stop", post(stop))
}

fn not_configured() -> ApiError {
    ApiError::Unavailable("No sensor endpoint configured (set SENSOR_ENDPOINT)".to_string())
}

async fn status(State(state): State<AppState>) -> Json<PollerStatus> {
    Json(state.polling_status())
}

async fn start(State(state): State<AppState>) -> Result<Json<PollerStatus>, ApiError> {
    // ---
    let poller = state.poller.as_ref().ok_or_else(not_configured)?;
    poller.start();
    Ok(Json(poller.status()))
}

async fn stop(State(state): State<AppState>) -> Result<Json<PollerStatus>, ApiError> {
    // ---
    let poller = state.poller.as_ref().ok_or_else(not_configured)?;
    poller.stop();
    Ok(Json(poller.status()))
}
