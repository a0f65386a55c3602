//! The shared normalize -> buffer -> persist path.
//!
//! Both the push endpoint and the polling collector hold an [`Ingestor`]
//! wired with the same buffer and sink.

use serde_json::Value;
use tracing::debug;

use crate::buffer::LiveBuffer;
use crate::error::ValidationError;
use crate::models::SensorReading;
use crate::normalize::normalize_reading;
use crate::store::PersistenceSink;

// ---

#[derive(Debug, Clone)]
pub struct Ingestor {
    buffer: LiveBuffer,
    sink: PersistenceSink,
}

impl Ingestor {
    pub fn new(buffer: LiveBuffer, sink: PersistenceSink) -> Self {
        Self { buffer, sink }
    }

    pub fn buffer(&self) -> &LiveBuffer {
        &self.buffer
    }

    pub fn sink(&self) -> &PersistenceSink {
        &self.sink
    }

    /// Accept one raw payload.
    ///
    /// The buffer append happens before the first await, so it is never
    /// interleaved with another append. A rejected payload leaves the buffer
    /// untouched; a failed persist does not fail the call.
    pub async fn ingest(&self, raw: &Value) -> Result<SensorReading, ValidationError> {
        // ---
        let reading = normalize_reading(raw)?;

        let evicted = self.buffer.append(reading.clone());
        if evicted > 0 {
            debug!("Live buffer at capacity, evicted {} reading(s)", evicted);
        }

        self.sink.save(&reading).await;
        Ok(reading)
    }
}
