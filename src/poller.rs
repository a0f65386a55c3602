//! Background collector that polls an external sensor endpoint.
//!
//! State machine: Stopped -> Running -> Stopped. A ticker task fires every
//! interval (the first tick immediately) and launches one fetch cycle as its
//! own task. Only one cycle is in flight at a time; a tick that arrives
//! while the previous cycle is still running is skipped. `stop()` cancels
//! the ticker only, so a cycle already in flight runs to completion.
//!
//! Every upstream failure (network, HTTP status, unknown envelope) is logged
//! and the collector waits for the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::ingest::Ingestor;

// ---

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a fetch cycle produced nothing.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("could not read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// Operator hint for recognizable network failures.
    pub fn hint(&self) -> Option<&'static str> {
        // ---
        let e = match self {
            FetchError::Network(e) | FetchError::Body(e) => e,
            FetchError::Status(_) => return None,
        };
        if e.is_timeout() {
            Some("Request timed out. Check network connection.")
        } else if e.is_connect() {
            Some("Connection refused. Is the sensor endpoint running?")
        } else {
            None
        }
    }
}

/// Counts for one processed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub extracted: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Diagnostic snapshot served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStatus {
    pub is_running: bool,
    pub endpoint: Option<String>,
    /// Milliseconds.
    pub poll_interval: u64,
    pub data_points_stored: usize,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Resolve a response body to raw reading payloads.
///
/// Precedence: bare array, `data` array, `success` + `data` (array or single
/// object), a body that itself looks like a reading. `None` means the
/// envelope was not recognized.
pub fn extract_readings(body: Value) -> Option<Vec<Value>> {
    // ---
    let mut obj = match body {
        Value::Array(items) => return Some(items),
        Value::Object(obj) => obj,
        _ => return None,
    };

    if matches!(obj.get("data"), Some(Value::Array(_))) {
        if let Some(Value::Array(items)) = obj.remove("data") {
            return Some(items);
        }
    }

    let success = obj.get("success").is_some_and(is_truthy);
    if success && obj.get("data").is_some_and(is_truthy) {
        return obj.remove("data").map(|data| match data {
            Value::Array(items) => items,
            single => vec![single],
        });
    }

    let looks_like_reading = ["timestamp", "sensor_id"]
        .iter()
        .any(|key| obj.get(*key).is_some_and(is_truthy));
    if looks_like_reading {
        return Some(vec![Value::Object(obj)]);
    }

    None
}

/// Everything a fetch cycle needs; shared by the ticker and cycle tasks.
#[derive(Debug)]
struct CycleRunner {
    endpoint: String,
    client: reqwest::Client,
    ingestor: Ingestor,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a cycle task ends, however it ends.
struct InFlightGuard(Arc<CycleRunner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl CycleRunner {
    async fn poll_once(&self) -> Result<CycleReport, FetchError> {
        // ---
        debug!("Fetching sensor data from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: Value = response.json().await.map_err(FetchError::Body)?;
        debug!("Raw poll response: {}", body);

        let Some(raw_readings) = extract_readings(body) else {
            warn!("Unknown response format from {}, skipping cycle", self.endpoint);
            return Ok(CycleReport::default());
        };

        let mut report = CycleReport {
            extracted: raw_readings.len(),
            ..Default::default()
        };

        for (i, raw) in raw_readings.iter().enumerate() {
            match self.ingestor.ingest(raw).await {
                Ok(_) => report.accepted += 1,
                Err(e) => {
                    warn!("Skipping item {} of polled batch: {}", i, e);
                    report.rejected += 1;
                }
            }
        }

        Ok(report)
    }

    async fn run_cycle(&self) {
        // ---
        match self.poll_once().await {
            Ok(report) if report.extracted == 0 => {
                info!("No new sensor data available");
            }
            Ok(report) => {
                info!(
                    "Processed {} sensor reading(s) ({} rejected)",
                    report.accepted, report.rejected
                );
            }
            Err(e) => {
                error!("Error fetching sensor data: {}", e);
                if let Some(hint) = e.hint() {
                    error!("   {}", hint);
                }
            }
        }
    }

    fn spawn_cycle(self: &Arc<Self>) {
        // ---
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("Previous poll cycle still in flight, skipping tick");
            return;
        }

        let guard = InFlightGuard(Arc::clone(self));
        tokio::spawn(async move {
            guard.0.run_cycle().await;
            drop(guard);
        });
    }
}

/// Polling collector for one external endpoint.
#[derive(Debug)]
pub struct SensorPoller {
    runner: Arc<CycleRunner>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SensorPoller {
    /// Build a stopped collector. `timeout` bounds each HTTP request.
    pub fn new(
        endpoint: impl Into<String>,
        interval: Duration,
        timeout: Duration,
        ingestor: Ingestor,
    ) -> Result<Self> {
        // ---
        if interval.is_zero() {
            return Err(anyhow!("poll interval must be greater than zero"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            runner: Arc::new(CycleRunner {
                endpoint: endpoint.into(),
                client,
                ingestor,
                in_flight: AtomicBool::new(false),
            }),
            interval,
            ticker: Mutex::new(None),
        })
    }

    fn ticker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start polling. Returns `false` if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        // ---
        let mut ticker = self.ticker();
        if ticker.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("Sensor polling service is already running");
            return false;
        }

        info!("Starting sensor polling service");
        info!("  Polling endpoint : {}", self.runner.endpoint);
        info!("  Poll interval    : {}ms", self.interval.as_millis());

        let runner = Arc::clone(&self.runner);
        let period = self.interval;
        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                runner.spawn_cycle();
            }
        }));

        true
    }

    /// Stop scheduling cycles. Idempotent; returns whether it was running.
    pub fn stop(&self) -> bool {
        // ---
        match self.ticker().take() {
            Some(handle) => {
                handle.abort();
                info!("Sensor polling service stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run a single fetch cycle now, outside the schedule.
    pub async fn poll_once(&self) -> Result<CycleReport, FetchError> {
        self.runner.poll_once().await
    }

    pub fn status(&self) -> PollerStatus {
        // ---
        PollerStatus {
            is_running: self.is_running(),
            endpoint: Some(self.runner.endpoint.clone()),
            poll_interval: self.interval.as_millis() as u64,
            data_points_stored: self.runner.ingestor.buffer().len(),
        }
    }
}

impl Drop for SensorPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::buffer::LiveBuffer;
    use crate::store::PersistenceSink;
    use serde_json::json;

    fn create_test_poller() -> SensorPoller {
        // ---
        let ingestor = Ingestor::new(LiveBuffer::new(100), PersistenceSink::disabled());
        SensorPoller::new(
            "http://127.0.0.1:1/sensor",
            Duration::from_millis(250),
            Duration::from_millis(100),
            ingestor,
        )
        .unwrap()
    }

    #[test]
    fn test_bare_array_envelope() {
        // ---
        let items = extract_readings(json!([{ "sensor_id": "a" }, { "sensor_id": "b" }]));
        assert_eq!(items.map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_data_array_envelope() {
        // ---
        let items = extract_readings(json!({ "data": [{ "id": 1 }] })).unwrap();
        assert_eq!(items, vec![json!({ "id": 1 })]);
    }

    #[test]
    fn test_empty_data_array_is_zero_readings() {
        // ---
        assert_eq!(extract_readings(json!({ "data": [] })), Some(vec![]));
        assert_eq!(extract_readings(json!([])), Some(vec![]));
    }

    #[test]
    fn test_success_envelope_with_single_object() {
        // ---
        let items = extract_readings(json!({
            "success": true,
            "data": { "sensor_id": "x", "temperature": 30 }
        }))
        .unwrap();
        assert_eq!(items, vec![json!({ "sensor_id": "x", "temperature": 30 })]);
    }

    #[test]
    fn test_success_flag_must_be_truthy() {
        // ---
        assert_eq!(
            extract_readings(json!({ "success": false, "data": { "sensor_id": "x" } })),
            None
        );
    }

    #[test]
    fn test_single_reading_body() {
        // ---
        let body = json!({ "timestamp": "2025-10-30T10:00:00Z", "aq2": 12 });
        assert_eq!(extract_readings(body.clone()), Some(vec![body]));
    }

    #[test]
    fn test_unrecognized_envelopes() {
        // ---
        assert_eq!(extract_readings(json!({})), None);
        assert_eq!(extract_readings(json!({ "readings": [] })), None);
        assert_eq!(extract_readings(json!("ok")), None);
        assert_eq!(extract_readings(json!(null)), None);
    }

    #[test]
    fn test_zero_interval_rejected() {
        // ---
        let ingestor = Ingestor::new(LiveBuffer::default(), PersistenceSink::disabled());
        assert!(
            SensorPoller::new("http://x", Duration::ZERO, DEFAULT_FETCH_TIMEOUT, ingestor).is_err()
        );
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        // ---
        let poller = create_test_poller();
        assert!(!poller.stop());
        assert!(!poller.is_running());

        assert!(poller.start());
        assert!(!poller.start());
        assert!(poller.is_running());

        assert!(poller.stop());
        assert!(!poller.stop());
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_status_reports_configuration() {
        // ---
        let poller = create_test_poller();
        let status = poller.status();

        assert!(!status.is_running);
        assert_eq!(status.endpoint.as_deref(), Some("http://127.0.0.1:1/sensor"));
        assert_eq!(status.poll_interval, 250);
        assert_eq!(status.data_points_stored, 0);

        let encoded = serde_json::to_value(&status).unwrap();
        assert_eq!(encoded["isRunning"], false);
        assert_eq!(encoded["dataPointsStored"], 0);
    }
}
