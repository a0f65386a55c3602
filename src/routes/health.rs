// src/routes/health.rs
//! API health check endpoints for the airwatch backend.
//!
//! `/health` is used by container orchestrators and CI pipelines to verify
//! that the service is running; `/` keeps the liveness banner the dashboard
//! pings on load. Neither touches the database, the buffer or the dataset.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct BannerResponse {
    msg: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Handle `GET /`.
async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        msg: "Backend is up!",
    })
}

/// Create a subrouter containing the health routes.
///
/// This router is generic over the application state so it can merge cleanly
/// with the gateway router, regardless of the state type.
///
/// # Type Parameters
/// - `S`: Application state type shared by all routes in the gateway.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}
