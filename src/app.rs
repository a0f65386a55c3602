//! Application state shared by every route.
//!
//! The live buffer is created once here and handed to both ingress paths,
//! so the push endpoint and the poller always see the same readings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::buffer::LiveBuffer;
use crate::config::Config;
use crate::history::CityDayCsv;
use crate::ingest::Ingestor;
use crate::poller::{PollerStatus, SensorPoller};
use crate::store::PersistenceSink;

// ---

#[derive(Debug, Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
    pub history: CityDayCsv,
    pub poller: Option<Arc<SensorPoller>>,
    pub live_location_tag: Arc<str>,
    poll_interval: Duration,
}

impl AppState {
    /// Wire buffer, sink, history source and (if configured) the poller.
    /// The poller is created stopped.
    pub fn new(cfg: &Config, sink: PersistenceSink) -> Result<Self> {
        // ---
        let buffer = LiveBuffer::new(cfg.buffer_capacity);
        let ingestor = Ingestor::new(buffer, sink);

        let poller = cfg
            .sensor_endpoint
            .as_deref()
            .map(|endpoint| {
                SensorPoller::new(
                    endpoint,
                    cfg.poll_interval,
                    cfg.poll_timeout,
                    ingestor.clone(),
                )
                .map(Arc::new)
            })
            .transpose()?;

        Ok(Self {
            ingestor,
            history: CityDayCsv::new(cfg.history_csv.clone()),
            poller,
            live_location_tag: Arc::from(cfg.live_location_tag.as_str()),
            poll_interval: cfg.poll_interval,
        })
    }

    pub fn buffer(&self) -> &LiveBuffer {
        self.ingestor.buffer()
    }

    pub fn sink(&self) -> &PersistenceSink {
        self.ingestor.sink()
    }

    /// Status of the poller, or an idle status when none is configured.
    pub fn polling_status(&self) -> PollerStatus {
        // ---
        match &self.poller {
            Some(poller) => poller.status(),
            None => PollerStatus {
                is_running: false,
                endpoint: None,
                poll_interval: self.poll_interval.as_millis() as u64,
                data_points_stored: self.buffer().len(),
            },
        }
    }
}
