use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Maps a backend confidence onto [0, 1].
///
/// Values above 1 are read as percentages. Exactly `1.0` is taken as already fractional,
/// so a backend meaning "1%" would be misread; the wire format carries no scale.
/// Non-finite input becomes 0, which hides the hotspot rather than failing the fetch.
pub fn normalize(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let fractional = if raw > 1.0 { raw / 100.0 } else { raw };
    fractional.clamp(0.0, 1.0)
}

/// A hotspot as `GET /reports/hotspots` returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHotspot {
    #[serde(default, deserialize_with = "lenient_id")]
    pub report_id: Option<String>,
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub latitude: f64,
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub longitude: f64,
    /// Either 0-1 or 0-100 depending on which backend path produced it.
    #[serde(default = "not_a_number", deserialize_with = "lenient_number")]
    pub confidence: f64,
    #[serde(default)]
    pub hazard_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn not_a_number() -> f64 {
    f64::NAN
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedHotspot {
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub confidence: f64,
    pub hazard_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NormalizedHotspot {
    /// `None` when the record has no usable position; it cannot be placed on a map.
    pub fn from_raw(raw: RawHotspot) -> Option<Self> {
        if !raw.latitude.is_finite() || !raw.longitude.is_finite() {
            return None;
        }

        Some(Self {
            id: raw.report_id,
            lat: raw.latitude,
            lng: raw.longitude,
            confidence: normalize(raw.confidence),
            hazard_type: raw.hazard_type,
            status: raw.status,
            created_at: raw.created_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn normalize_all(raw: impl IntoIterator<Item = RawHotspot>) -> Vec<NormalizedHotspot> {
    raw.into_iter()
        .filter_map(|hotspot| {
            let id = hotspot.report_id.clone();
            let normalized = NormalizedHotspot::from_raw(hotspot);
            if normalized.is_none() {
                log_warn!("Skipping hotspot {:?} without coordinates", id);
            }
            normalized
        })
        .collect()
}
