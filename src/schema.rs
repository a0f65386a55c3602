//! Database schema management for `airwatch`.
//!
//! Ensures the readings table and its index exist before serving requests.
//! Applied once on startup from `main.rs` when a database is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema (idempotent).
///
/// One row per canonical reading: measurements and GPS are kept as JSONB
/// documents so firmware-specific extra keys survive. Safe to call on every
/// startup; no-op if objects already exist.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id          BIGSERIAL   PRIMARY KEY,
            timestamp   TIMESTAMPTZ NOT NULL,
            sensor_id   TEXT        NOT NULL,
            "values"    JSONB       NOT NULL,
            location    JSONB,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Latest-reading lookups sort on timestamp
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_timestamp
            ON sensor_readings (timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_sensor_id
            ON sensor_readings (sensor_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
