//! Data models for the air-quality pipeline.
//!
//! A [`SensorReading`] is the canonical shape every ingress path produces.
//! [`HistoricalRow`] is one parsed line of the city/day dataset and
//! [`MergedRecord`] is the flat shape both are reshaped into for queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---

/// A GPS fix. Altitude defaults to 0 when a device omits it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

/// Named measurements carried by a reading.
///
/// The three well-known measurements are typed; anything else a firmware
/// sends inside a structured `values` object is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    // ---
    /// Gas-proxy pollutant concentration (MQ-135 style `aq2` channel).
    #[serde(rename = "aq2", alias = "gasLevel", default)]
    pub gas_level: Option<f64>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub humidity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GeoPoint>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub sensor_id: String,
    pub values: SensorValues,
    pub location: Option<GeoPoint>,
}

impl SensorReading {
    /// Build a reading, enforcing the non-empty sensor id invariant.
    ///
    /// When no explicit location is given the fix from `values.gps` is used.
    pub fn new(
        timestamp: DateTime<Utc>,
        sensor_id: impl Into<String>,
        values: SensorValues,
        location: Option<GeoPoint>,
    ) -> Option<Self> {
        // ---
        let sensor_id = sensor_id.into();
        if sensor_id.trim().is_empty() {
            return None;
        }
        let location = location.or(values.gps);

        Some(Self {
            timestamp,
            sensor_id,
            values,
            location,
        })
    }
}

/// One row of the static city/day dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRow {
    pub city: String,
    pub date: String,
    /// Month number parsed from `date`, if it is `YYYY-MM-DD` shaped.
    pub month: Option<u32>,
    pub aqi: Option<f64>,
    /// Ancillary pollutant columns (PM2.5, NO2, ...). Empty cells are absent.
    pub pollutants: BTreeMap<String, f64>,
}

/// Which block of the merged dataset a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Historical,
    Live,
}

/// Keys a live reading's extra values may not shadow in a [`MergedRecord`].
const RESERVED_RECORD_KEYS: &[&str] =
    &["City", "Date", "Month", "sensor_id", "timestamp", "source"];

/// Flat record served by the merged-data query.
///
/// Field names follow the dataset's column headers so dashboard code can
/// read historical and live rows the same way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    // ---
    #[serde(rename = "City")]
    pub city: String,

    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Month", skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,

    #[serde(rename = "AQI")]
    pub aqi: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,

    pub source: RecordSource,
}

impl From<HistoricalRow> for MergedRecord {
    fn from(row: HistoricalRow) -> Self {
        // ---
        MergedRecord {
            city: row.city,
            date: row.date,
            month: row.month,
            aqi: row.aqi,
            sensor_id: None,
            timestamp: None,
            fields: row.pollutants,
            source: RecordSource::Historical,
        }
    }
}

impl MergedRecord {
    /// Reshape a live reading into the flat historical shape.
    ///
    /// Only measurements the reading actually carries become fields; absent
    /// values are left out rather than zero-filled.
    pub fn from_live(reading: &SensorReading, location_tag: &str) -> Self {
        // ---
        let mut fields = BTreeMap::new();
        let values = &reading.values;

        if let Some(v) = values.gas_level {
            fields.insert("aq2".to_string(), v);
        }
        if let Some(v) = values.temperature {
            fields.insert("temperature".to_string(), v);
        }
        if let Some(v) = values.humidity {
            fields.insert("humidity".to_string(), v);
        }
        for (key, value) in &values.extra {
            if RESERVED_RECORD_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(v) = value.as_f64() {
                fields.insert(key.clone(), v);
            }
        }
        if let Some(loc) = reading.location {
            fields.insert("latitude".to_string(), loc.latitude);
            fields.insert("longitude".to_string(), loc.longitude);
            fields.insert("altitude".to_string(), loc.altitude);
        }

        // Devices do not report AQI; keep it only if a firmware sends one.
        let aqi = fields.remove("AQI");

        MergedRecord {
            city: location_tag.to_string(),
            date: reading.timestamp.format("%Y-%m-%d").to_string(),
            month: Some(reading.timestamp.month()),
            aqi,
            sensor_id: Some(reading.sensor_id.clone()),
            timestamp: Some(reading.timestamp),
            fields,
            source: RecordSource::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_reading(values: SensorValues, location: Option<GeoPoint>) -> SensorReading {
        // ---
        SensorReading::new(
            Utc.with_ymd_and_hms(2025, 10, 30, 10, 0, 0).unwrap(),
            "arduino-uno-001",
            values,
            location,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_sensor_id_rejected() {
        // ---
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(SensorReading::new(ts, "", SensorValues::default(), None).is_none());
        assert!(SensorReading::new(ts, "   ", SensorValues::default(), None).is_none());
    }

    #[test]
    fn test_location_falls_back_to_values_gps() {
        // ---
        let gps = GeoPoint {
            latitude: 19.076,
            longitude: 72.8777,
            altitude: 14.2,
        };
        let values = SensorValues {
            gps: Some(gps),
            ..Default::default()
        };

        let reading = create_test_reading(values, None);
        assert_eq!(reading.location, Some(gps));
    }

    #[test]
    fn test_values_serialize_with_device_keys() {
        // ---
        let values = SensorValues {
            gas_level: Some(123.4),
            temperature: Some(27.5),
            humidity: None,
            gps: None,
            extra: Map::new(),
        };

        let encoded = serde_json::to_value(&values).unwrap();
        assert_eq!(
            encoded,
            json!({ "aq2": 123.4, "temperature": 27.5, "humidity": null })
        );
    }

    #[test]
    fn test_values_accept_gas_level_alias_and_keep_extras() {
        // ---
        let values: SensorValues =
            serde_json::from_value(json!({ "gasLevel": 88.0, "pm25": 41.0 })).unwrap();

        assert_eq!(values.gas_level, Some(88.0));
        assert_eq!(values.extra.get("pm25"), Some(&json!(41.0)));
    }

    #[test]
    fn test_live_record_only_carries_present_fields() {
        // ---
        let values = SensorValues {
            temperature: Some(30.0),
            ..Default::default()
        };
        let record = MergedRecord::from_live(&create_test_reading(values, None), "Live Sensor");

        assert_eq!(record.city, "Live Sensor");
        assert_eq!(record.date, "2025-10-30");
        assert_eq!(record.month, Some(10));
        assert_eq!(record.aqi, None);
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields.get("temperature"), Some(&30.0));
        assert_eq!(record.source, RecordSource::Live);
    }

    #[test]
    fn test_historical_record_serializes_dataset_columns() {
        // ---
        let mut pollutants = BTreeMap::new();
        pollutants.insert("PM2.5".to_string(), 83.13);

        let record = MergedRecord::from(HistoricalRow {
            city: "Ahmedabad".to_string(),
            date: "2015-01-01".to_string(),
            month: Some(1),
            aqi: Some(149.0),
            pollutants,
        });

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["City"], "Ahmedabad");
        assert_eq!(encoded["Month"], 1);
        assert_eq!(encoded["AQI"], 149.0);
        assert_eq!(encoded["PM2.5"], 83.13);
        assert_eq!(encoded["source"], "historical");
        assert!(encoded.get("sensor_id").is_none());
    }
}
