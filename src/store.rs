//! Durable mirror of canonical readings.
//!
//! Reads are always served from the live buffer and the historical file, so
//! the store is strictly best-effort. [`PersistenceSink`] is the capability
//! object the pipeline holds: it may wrap no store at all, and it never lets
//! a storage failure reach the ingest path.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::models::{GeoPoint, SensorReading, SensorValues};

// ---

/// A backend able to persist readings.
#[async_trait]
pub trait ReadingStore: Send + Sync + std::fmt::Debug {
    /// Whether the backend is currently configured and reachable.
    fn is_available(&self) -> bool;

    async fn save(&self, reading: &SensorReading) -> Result<()>;

    /// Most recent reading by timestamp.
    async fn latest(&self) -> Result<Option<SensorReading>>;
}

/// Postgres-backed store writing to the `sensor_readings` table.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `db_url`.
    pub async fn connect(db_url: &str, pool_max: u32) -> Result<Self> {
        // ---
        let pool = PgPoolOptions::new()
            .max_connections(pool_max)
            .acquire_timeout(Duration::from_secs(5))
            .connect(db_url)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        info!("Successfully connected to database");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type ReadingRow = (
    DateTime<Utc>,
    String,
    Json<SensorValues>,
    Option<Json<GeoPoint>>,
);

#[async_trait]
impl ReadingStore for PgReadingStore {
    fn is_available(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn save(&self, reading: &SensorReading) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO sensor_readings (timestamp, sensor_id, "values", location)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(reading.timestamp)
        .bind(&reading.sensor_id)
        .bind(Json(&reading.values))
        .bind(reading.location.map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest(&self) -> Result<Option<SensorReading>> {
        // ---
        let row: Option<ReadingRow> = sqlx::query_as(
            r#"
            SELECT timestamp, sensor_id, "values", location
            FROM sensor_readings
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(timestamp, sensor_id, values, location)| SensorReading {
            timestamp,
            sensor_id,
            values: values.0,
            location: location.map(|l| l.0),
        }))
    }
}

/// Best-effort persistence wrapper around an optional store.
#[derive(Debug, Clone, Default)]
pub struct PersistenceSink {
    store: Option<Arc<dyn ReadingStore>>,
}

impl PersistenceSink {
    pub fn new(store: Option<Arc<dyn ReadingStore>>) -> Self {
        Self { store }
    }

    /// A sink with no backend; every save is a no-op.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.store.as_ref().is_some_and(|s| s.is_available())
    }

    /// Persist a reading. Failures are logged and swallowed.
    /// Returns whether the reading was written.
    pub async fn save(&self, reading: &SensorReading) -> bool {
        // ---
        let Some(store) = self.store.as_ref().filter(|s| s.is_available()) else {
            debug!("No durable store available, skipping persist");
            return false;
        };

        match store.save(reading).await {
            Ok(()) => {
                debug!("Saved reading from sensor: {}", reading.sensor_id);
                true
            }
            Err(e) => {
                error!(
                    "Failed to persist reading from sensor {}: {:#}",
                    reading.sensor_id, e
                );
                false
            }
        }
    }

    /// Latest durable reading, or `None` when unavailable or on error.
    pub async fn latest(&self) -> Option<SensorReading> {
        // ---
        let store = self.store.as_ref().filter(|s| s.is_available())?;

        match store.latest().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Latest-reading lookup failed, falling back to memory: {:#}", e);
                None
            }
        }
    }
}
