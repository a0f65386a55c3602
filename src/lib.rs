//! `airwatch` - air-quality sensor ingestion and reconciliation.
//!
//! Readings arrive by device push (`POST /api/sensor-data`) or by polling an
//! external endpoint. Both paths run the same normalize -> buffer -> persist
//! pipeline against one shared [`LiveBuffer`]. Query routes merge the buffer
//! with the static city/day dataset and derive forecasts and advice.
//!
//! This file is the module gateway (EMBP): route handlers and the binary
//! import through the re-exports below, so they never depend on where a
//! type lives inside the crate.

mod app;
mod buffer;
mod config;
mod error;
mod forecast;
mod history;
mod ingest;
mod models;
mod normalize;
mod poller;
mod routes;
mod schema;
mod store;

pub use app::AppState;
pub use buffer::{LiveBuffer, DEFAULT_CAPACITY};
pub use config::{load_from_env, Config};
pub use error::{ApiError, ValidationError};
pub use forecast::{
    bucket_for, mitigation_advice, predict_aqi_for_month, AqiBucket, MitigationAdvice,
    AQI_BUCKETS, FALLBACK_BUCKET,
};
pub use history::{
    available_locations, merge_with_history, parse_city_day, CityDayCsv, ALL_LOCATIONS,
};
pub use ingest::Ingestor;
pub use models::{
    GeoPoint, HistoricalRow, MergedRecord, RecordSource, SensorReading, SensorValues,
};
pub use normalize::{normalize_reading, parse_timestamp, UNNAMED_SENSOR_ID};
pub use poller::{extract_readings, CycleReport, FetchError, PollerStatus, SensorPoller};
pub use routes::router;
pub use schema::create_schema;
pub use store::{PersistenceSink, PgReadingStore, ReadingStore};
