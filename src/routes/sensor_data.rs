use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{ApiError, AppState, SensorReading, ValidationError};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/sensor-data", post(ingest))
        .route("/api/sensor-data/latest", get(latest))
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    received: SensorReading,
}

#[derive(Debug, Serialize)]
struct LatestResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<SensorReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// `POST /api/sensor-data` - accept one device-pushed reading.
async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    // ---
    let Json(raw) = payload.map_err(|e| ValidationError::InvalidBody(e.body_text()))?;

    let reading = state.ingestor.ingest(&raw).await?;
    info!("POST /api/sensor-data - accepted reading from {}", reading.sensor_id);

    Ok(Json(IngestResponse {
        status: "received",
        received: reading,
    }))
}

/// `GET /api/sensor-data/latest` - durable store first, then the buffer.
async fn latest(State(state): State<AppState>) -> Json<LatestResponse> {
    // ---
    if let Some(reading) = state.sink().latest().await {
        debug!("GET /api/sensor-data/latest - served from database");
        return Json(LatestResponse {
            success: true,
            source: Some("database"),
            data: Some(reading),
            message: None,
        });
    }

    match state.buffer().latest() {
        Some(reading) => Json(LatestResponse {
            success: true,
            source: Some("memory"),
            data: Some(reading),
            message: None,
        }),
        None => Json(LatestResponse {
            success: false,
            source: None,
            data: None,
            message: Some("No sensor data available"),
        }),
    }
}
