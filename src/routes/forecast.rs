use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    mitigation_advice, predict_aqi_for_month, ApiError, AppState, MitigationAdvice, ValidationError,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    // Trailing-slash forms are what the dashboard requests.
    Router::new()
        .route("/api/predict-aqi", get(predict_aqi))
        .route("/api/predict-aqi/", get(predict_aqi))
        .route("/api/mitigation-advice", get(advice))
        .route("/api/mitigation-advice/", get(advice))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdviceQuery {
    aqi: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictionResponse {
    month: u32,
    predicted_aqi: Option<f64>,
    mitigation: Option<MitigationAdvice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn parse_month(raw: Option<&str>) -> Result<u32, ValidationError> {
    // ---
    let invalid = |reason: &str| ValidationError::InvalidParam {
        name: "month",
        reason: reason.to_string(),
    };

    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("is required"))?;
    raw.parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| invalid("must be an integer between 1 and 12"))
}

fn parse_aqi(raw: Option<&str>) -> Result<f64, ValidationError> {
    // ---
    let invalid = |reason: &str| ValidationError::InvalidParam {
        name: "aqi",
        reason: reason.to_string(),
    };

    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("is required"))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| invalid("must be a non-negative number"))
}

/// `GET /api/predict-aqi?month=N` - monthly historical average.
async fn predict_aqi(
    Query(params): Query<PredictQuery>,
    State(state): State<AppState>,
) -> Result<Json<PredictionResponse>, ApiError> {
    // ---
    let month = parse_month(params.month.as_deref())?;
    let historical = state.history.load_async().await?;

    let response = match predict_aqi_for_month(&historical, month) {
        Some(predicted) => PredictionResponse {
            month,
            predicted_aqi: Some(predicted),
            mitigation: Some(mitigation_advice(predicted)),
            message: None,
        },
        None => PredictionResponse {
            month,
            predicted_aqi: None,
            mitigation: None,
            message: Some("No data for month."),
        },
    };

    info!(
        "GET /api/predict-aqi - month {} -> {:?}",
        month, response.predicted_aqi
    );
    Ok(Json(response))
}

/// `GET /api/mitigation-advice?aqi=X`
async fn advice(Query(params): Query<AdviceQuery>) -> Result<Json<MitigationAdvice>, ApiError> {
    // ---
    let aqi = parse_aqi(params.aqi.as_deref())?;
    Ok(Json(mitigation_advice(aqi)))
}
