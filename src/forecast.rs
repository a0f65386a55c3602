//! Monthly AQI forecast and mitigation advice lookup.

use serde::Serialize;

use crate::models::HistoricalRow;

// ---

/// One row of the advice table. A bucket starts just above the previous
/// bucket's `high` and includes its own.
#[derive(Debug)]
pub struct AqiBucket {
    pub high: f64,
    pub category: &'static str,
    pub warnings: &'static [&'static str],
    pub actions: &'static [&'static str],
}

pub const AQI_BUCKETS: &[AqiBucket] = &[
    AqiBucket {
        high: 50.0,
        category: "Good",
        warnings: &["No immediate action required."],
        actions: &["Enjoy outdoor activities."],
    },
    AqiBucket {
        high: 80.0,
        category: "Moderate",
        warnings: &["Air quality is acceptable."],
        actions: &["Sensitive groups should consider reducing prolonged exertion."],
    },
    AqiBucket {
        high: 120.0,
        category: "Unhealthy for Sensitive Groups",
        warnings: &["Wear masks outdoors."],
        actions: &["Install air purifiers indoors."],
    },
    AqiBucket {
        high: 150.0,
        category: "Unhealthy",
        warnings: &["Wear N95 masks."],
        actions: &["Avoid outdoor activities.", "Use air purifiers."],
    },
    AqiBucket {
        high: 200.0,
        category: "Very Unhealthy",
        warnings: &["Health alert: Everyone may experience effects."],
        actions: &["Close windows.", "Run air purifiers at max."],
    },
    AqiBucket {
        high: 300.0,
        category: "Hazardous",
        warnings: &["Emergency conditions."],
        actions: &["Stay indoors.", "Use oxygen masks if necessary."],
    },
    AqiBucket {
        high: 500.0,
        category: "Severe",
        warnings: &["Evacuate if possible."],
        actions: &["Seek medical help for breathing issues."],
    },
];

/// Advice for AQI values above the last bucket.
pub static FALLBACK_BUCKET: AqiBucket = AqiBucket {
    high: f64::INFINITY,
    category: "Unhealthy",
    warnings: &["Wear N95 masks"],
    actions: &["Seek medical help for breathing issues"],
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MitigationAdvice {
    #[serde(rename = "AQI")]
    pub aqi: f64,
    pub category: String,
    pub warnings: Vec<String>,
    pub actions: Vec<String>,
}

/// Bucket for a non-negative AQI.
///
/// Upper bounds are inclusive, so a fractional value such as 50.5 lands in
/// the next bucket up.
pub fn bucket_for(aqi: f64) -> &'static AqiBucket {
    AQI_BUCKETS
        .iter()
        .find(|b| aqi <= b.high)
        .unwrap_or(&FALLBACK_BUCKET)
}

pub fn mitigation_advice(aqi: f64) -> MitigationAdvice {
    // ---
    let bucket = bucket_for(aqi);
    MitigationAdvice {
        aqi,
        category: bucket.category.to_string(),
        warnings: bucket.warnings.iter().map(|s| s.to_string()).collect(),
        actions: bucket.actions.iter().map(|s| s.to_string()).collect(),
    }
}

/// Average AQI of all historical rows for `month`, rounded to two decimals.
/// `None` when no row for that month carries an AQI.
pub fn predict_aqi_for_month(rows: &[HistoricalRow], month: u32) -> Option<f64> {
    // ---
    let (sum, count) = rows
        .iter()
        .filter(|r| r.month == Some(month))
        .filter_map(|r| r.aqi)
        .fold((0.0, 0usize), |(sum, count), aqi| (sum + aqi, count + 1));

    if count == 0 {
        return None;
    }
    let avg = sum / count as f64;
    Some((avg * 100.0).round() / 100.0)
}
