//! Payload normalization.
//!
//! Device firmwares and gateways disagree on field names. Each canonical
//! field is resolved from an ordered alias table; the first candidate that
//! yields a usable value wins.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::{GeoPoint, SensorReading, SensorValues};

// ---

pub const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time"];
pub const SENSOR_ID_KEYS: &[&str] = &["sensor_id", "sensorId", "id"];
pub const GAS_LEVEL_KEYS: &[&str] = &["aq2", "gasLevel", "gasAq2Ppm", "gas"];
pub const TEMPERATURE_KEYS: &[&str] = &["temperature", "temperatureC", "temp"];
pub const HUMIDITY_KEYS: &[&str] = &["humidity", "humidityPct"];
pub const GPS_KEYS: &[&str] = &["gps", "location"];
pub const LATITUDE_KEYS: &[&str] = &["latitude", "lat"];
pub const LONGITUDE_KEYS: &[&str] = &["longitude", "lng", "lon"];
pub const ALTITUDE_KEYS: &[&str] = &["altitude", "alt"];

/// Sensor id used when a payload names no device at all.
pub const UNNAMED_SENSOR_ID: &str = "external-sensor-001";

/// Return the first candidate for which `extract` produces a value.
fn first_match<'a, T>(
    obj: &'a Map<String, Value>,
    keys: &[&str],
    extract: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(extract)
}

/// Numbers, or strings holding a number. Null and anything else is absent.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn as_sensor_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a GPS sub-object. Latitude and longitude are both required.
fn as_geo_point(value: &Value) -> Option<GeoPoint> {
    // ---
    let obj = value.as_object()?;
    let latitude = first_match(obj, LATITUDE_KEYS, as_number)?;
    let longitude = first_match(obj, LONGITUDE_KEYS, as_number)?;
    let altitude = first_match(obj, ALTITUDE_KEYS, as_number).unwrap_or(0.0);

    Some(GeoPoint {
        latitude,
        longitude,
        altitude,
    })
}

/// Parse an instant from RFC 3339, a naive `YYYY-MM-DD HH:MM:SS` (taken as
/// UTC), or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ValidationError> {
    // ---
    let invalid = || ValidationError::InvalidTimestamp(value.to_string());

    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(invalid)
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Resolve the typed measurements from `obj`. Unusable values are absent.
fn typed_values(obj: &Map<String, Value>) -> SensorValues {
    // ---
    SensorValues {
        gas_level: first_match(obj, GAS_LEVEL_KEYS, as_number),
        temperature: first_match(obj, TEMPERATURE_KEYS, as_number),
        humidity: first_match(obj, HUMIDITY_KEYS, as_number),
        gps: first_match(obj, GPS_KEYS, as_geo_point),
        extra: Map::new(),
    }
}

fn is_measurement_key(key: &str) -> bool {
    [GAS_LEVEL_KEYS, TEMPERATURE_KEYS, HUMIDITY_KEYS, GPS_KEYS]
        .iter()
        .any(|keys| keys.contains(&key))
}

/// Build values from a device's own `values` object. Keys outside the alias
/// tables are carried through in `extra`.
fn values_from_structured(obj: &Map<String, Value>) -> SensorValues {
    // ---
    let extra = obj
        .iter()
        .filter(|(key, _)| !is_measurement_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    SensorValues {
        extra,
        ..typed_values(obj)
    }
}

/// Null and blank strings count as not sent.
fn present(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other),
    }
}

/// Normalize one raw payload into a canonical [`SensorReading`].
///
/// A structured `values` object is kept with its own keys, resolved through
/// the same alias tables; otherwise measurements are collected from flat
/// aliases. Missing timestamps default to now and a
/// missing id to [`UNNAMED_SENSOR_ID`], so in practice only non-object
/// payloads or malformed fields are rejected.
pub fn normalize_reading(raw: &Value) -> Result<SensorReading, ValidationError> {
    // ---
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let timestamp = match first_match(obj, TIMESTAMP_KEYS, present) {
        Some(value) => parse_timestamp(value)?,
        None => Utc::now(),
    };

    let sensor_id = first_match(obj, SENSOR_ID_KEYS, as_sensor_id)
        .unwrap_or_else(|| UNNAMED_SENSOR_ID.to_string());

    let values = match obj.get("values") {
        Some(Value::Object(structured)) => values_from_structured(structured),
        Some(Value::Null) | None => typed_values(obj),
        Some(other) => {
            return Err(ValidationError::InvalidValues(format!(
                "expected an object, got {}",
                other
            )))
        }
    };

    let location = obj.get("location").and_then(as_geo_point);

    SensorReading::new(timestamp, sensor_id, values, location)
        .ok_or(ValidationError::MissingSensorId)
}
