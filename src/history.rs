//! Historical dataset loading and the historical + live merge.
//!
//! The city/day file is re-read on every call; there is no cache. Merging is
//! a concatenation: historical rows first, then live readings in arrival
//! order. Nothing is deduplicated or re-sorted.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use crate::models::{HistoricalRow, MergedRecord, SensorReading};

// ---

/// Location filter value meaning "no filter".
pub const ALL_LOCATIONS: &str = "All Cities";

const CITY_COLUMN: &str = "City";
const DATE_COLUMN: &str = "Date";
const AQI_COLUMN: &str = "AQI";
// Month is derived from Date.
const DROPPED_COLUMNS: &[&str] = &["AQI_Bucket", "Month"];

/// Read-only handle on the city/day CSV file.
#[derive(Debug, Clone)]
pub struct CityDayCsv {
    path: PathBuf,
}

impl CityDayCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load and parse the file. A missing file is an empty dataset.
    pub fn load(&self) -> Result<Vec<HistoricalRow>> {
        // ---
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Historical dataset {} not found, serving live data only",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("open {}", self.path.display()));
            }
        };

        let rows = parse_city_day(file).with_context(|| format!("parse {}", self.path.display()))?;
        debug!("Loaded {} historical rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// [`load`](Self::load) on the blocking pool.
    pub async fn load_async(&self) -> Result<Vec<HistoricalRow>> {
        // ---
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| anyhow!("history loader task failed: {}", e))?
    }
}

/// Month number from a `YYYY-MM-DD` date.
fn parse_month(date: &str) -> Option<u32> {
    date.split('-')
        .nth(1)
        .and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
}

fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse city/day CSV content.
///
/// `City` and `Date` columns are required. `AQI` is optional per row, the
/// bucket column is dropped and every other non-empty numeric cell becomes
/// a pollutant field.
pub fn parse_city_day<R: io::Read>(reader: R) -> Result<Vec<HistoricalRow>> {
    // ---
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("read CSV headers")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let (Some(city_idx), Some(date_idx)) = (column(CITY_COLUMN), column(DATE_COLUMN)) else {
        bail!(
            "city/day CSV must have '{}' and '{}' columns, got: {}",
            CITY_COLUMN,
            DATE_COLUMN,
            headers.iter().collect::<Vec<_>>().join(",")
        );
    };
    let aqi_idx = column(AQI_COLUMN);

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let record = rec.map_err(|e| anyhow!("invalid CSV row {}: {}", idx + 2, e))?;

        let city = record.get(city_idx).unwrap_or_default().to_string();
        let date = record.get(date_idx).unwrap_or_default().to_string();
        let aqi = aqi_idx.and_then(|i| record.get(i)).and_then(parse_number);

        let mut pollutants = BTreeMap::new();
        for (i, (header, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if i == city_idx || i == date_idx || Some(i) == aqi_idx {
                continue;
            }
            if DROPPED_COLUMNS.contains(&header) {
                continue;
            }
            if let Some(v) = parse_number(cell) {
                pollutants.insert(header.to_string(), v);
            }
        }

        rows.push(HistoricalRow {
            month: parse_month(&date),
            city,
            date,
            aqi,
            pollutants,
        });
    }

    Ok(rows)
}

fn is_all_locations(location: &str) -> bool {
    location.trim().is_empty() || location.trim().eq_ignore_ascii_case(ALL_LOCATIONS)
}

/// Concatenate historical rows and live readings, optionally keeping only
/// records whose location tag matches `location` (case-insensitive).
pub fn merge_with_history(
    historical: Vec<HistoricalRow>,
    live: &[SensorReading],
    live_location_tag: &str,
    location: Option<&str>,
) -> Vec<MergedRecord> {
    // ---
    let mut merged: Vec<MergedRecord> = historical.into_iter().map(MergedRecord::from).collect();
    merged.extend(
        live.iter()
            .map(|reading| MergedRecord::from_live(reading, live_location_tag)),
    );

    match location.filter(|l| !is_all_locations(l)) {
        Some(wanted) => {
            let wanted = wanted.trim().to_lowercase();
            merged.retain(|r| r.city.to_lowercase() == wanted);
            merged
        }
        None => merged,
    }
}

/// Distinct location tags, sorted, behind a leading [`ALL_LOCATIONS`].
pub fn available_locations(records: &[MergedRecord]) -> Vec<String> {
    // ---
    let tags: BTreeSet<&str> = records
        .iter()
        .map(|r| r.city.as_str())
        .filter(|c| !c.trim().is_empty() && !is_all_locations(c))
        .collect();

    std::iter::once(ALL_LOCATIONS.to_string())
        .chain(tags.into_iter().map(str::to_string))
        .collect()
}
