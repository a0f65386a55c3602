//! Route gateway: merges every subrouter and attaches the shared state.

use axum::Router;

use crate::AppState;

mod forecast;
mod health;
mod merged;
mod polling;
mod sensor_data;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(sensor_data::router())
        .merge(merged::router())
        .merge(forecast::router())
        .merge(polling::router())
        .merge(health::router())
        .with_state(state)
}
