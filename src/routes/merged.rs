use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{available_locations, merge_with_history, ApiError, AppState, MergedRecord};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/merged-data", get(merged_data))
        .route("/api/locations", get(locations))
}

/// Query parameters for the merged dataset.
#[derive(Debug, Deserialize)]
pub struct MergedQuery {
    /// Location tag; absent or "All Cities" disables filtering.
    #[serde(alias = "location")]
    city: Option<String>,
}

async fn load_merged(state: &AppState, city: Option<&str>) -> Result<Vec<MergedRecord>, ApiError> {
    // ---
    let historical = state.history.load_async().await?;
    let live = state.buffer().snapshot();

    Ok(merge_with_history(
        historical,
        &live,
        &state.live_location_tag,
        city,
    ))
}

/// `GET /api/merged-data` - historical rows followed by live readings.
async fn merged_data(
    Query(params): Query<MergedQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MergedRecord>>, ApiError> {
    // ---
    let merged = load_merged(&state, params.city.as_deref()).await?;
    info!(
        "GET /api/merged-data - returning {} records (filter: {:?})",
        merged.len(),
        params.city
    );
    Ok(Json(merged))
}

/// `GET /api/locations` - distinct location tags behind the sentinel.
async fn locations(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    // ---
    let merged = load_merged(&state, None).await?;
    Ok(Json(available_locations(&merged)))
}
