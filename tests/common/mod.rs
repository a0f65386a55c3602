//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use airwatch::{AppState, Config, PersistenceSink, ReadingStore, SensorReading};

// ---

pub const SAMPLE_CSV: &str = "\
City,Date,PM2.5,PM10,NO2,CO,AQI,AQI_Bucket
Ahmedabad,2015-01-29,83.13,,28.71,6.93,209.0,Poor
Ahmedabad,2016-01-12,79.84,,26.4,3.2,191.0,Moderate
Delhi,2015-02-05,313.22,607.98,69.16,15.2,472.0,Severe
";

/// Store double that keeps saved readings in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub saved: Mutex<Vec<SensorReading>>,
}

impl MemoryStore {
    pub fn count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    fn is_available(&self) -> bool {
        true
    }

    async fn save(&self, reading: &SensorReading) -> Result<()> {
        self.saved.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<SensorReading>> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|r| r.timestamp)
            .cloned())
    }
}

/// Store double whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl ReadingStore for FailingStore {
    fn is_available(&self) -> bool {
        true
    }

    async fn save(&self, _reading: &SensorReading) -> Result<()> {
        Err(anyhow!("disk full"))
    }

    async fn latest(&self) -> Result<Option<SensorReading>> {
        Err(anyhow!("disk full"))
    }
}

pub fn sink_with(store: Arc<dyn ReadingStore>) -> PersistenceSink {
    PersistenceSink::new(Some(store))
}

/// Write `contents` to a temp CSV and return a config pointing at it.
pub fn config_with_history(contents: &str) -> (Config, tempfile::NamedTempFile) {
    // ---
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();

    let cfg = Config {
        history_csv: file.path().to_path_buf(),
        ..Config::default()
    };
    (cfg, file)
}

pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Serve the router on an ephemeral port.
pub async fn spawn_app(cfg: &Config, sink: PersistenceSink) -> TestApp {
    // ---
    let state = AppState::new(cfg, sink).unwrap();
    let app = airwatch::router(state.clone());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        state,
        client: reqwest::Client::new(),
    }
}
