use std::fmt;

use serde::{Deserialize, Serialize};

/// Hazard types the backend accepts for `user_hazard_type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    Tsunami,
    HighWaves,
    StormSurge,
    Flooding,
    Cyclone,
    Swell,
    RipCurrent,
    CoastalErosion,
    AlgalBloom,
    Pollution,
    Other,
}

impl HazardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Tsunami => "tsunami",
            HazardType::HighWaves => "high_waves",
            HazardType::StormSurge => "storm_surge",
            HazardType::Flooding => "flooding",
            HazardType::Cyclone => "cyclone",
            HazardType::Swell => "swell",
            HazardType::RipCurrent => "rip_current",
            HazardType::CoastalErosion => "coastal_erosion",
            HazardType::AlgalBloom => "algal_bloom",
            HazardType::Pollution => "pollution",
            HazardType::Other => "other",
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category keys offered by the report form, and what the backend calls them.
///
/// Keys are matched after `category_key` folding, so the form's display labels
/// ("Oil Spill") and its slugs ("oil_spill") hit the same row.
const CATEGORY_TABLE: &[(&str, HazardType)] = &[
    ("tsunami", HazardType::Tsunami),
    ("high_waves", HazardType::HighWaves),
    ("rogue_wave", HazardType::HighWaves),
    ("storm_surge", HazardType::StormSurge),
    ("flooding", HazardType::Flooding),
    ("coastal_flooding", HazardType::Flooding),
    ("cyclone", HazardType::Cyclone),
    ("hurricane", HazardType::Cyclone),
    ("typhoon", HazardType::Cyclone),
    ("weather_hazard", HazardType::Cyclone),
    ("swell", HazardType::Swell),
    ("swell_surge", HazardType::Swell),
    ("rip_current", HazardType::RipCurrent),
    ("coastal_erosion", HazardType::CoastalErosion),
    ("algal_bloom", HazardType::AlgalBloom),
    ("oil_spill", HazardType::Pollution),
    ("marine_pollution", HazardType::Pollution),
    ("pollution", HazardType::Pollution),
    ("other", HazardType::Other),
];

fn category_key(category: &str) -> String {
    category
        .trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Maps a form category onto the backend vocabulary. Anything not in the table becomes
/// `HazardType::Other`; the backend still accepts the report and triage sorts it out.
pub fn map_category(category: &str) -> HazardType {
    let key = category_key(category);
    CATEGORY_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, hazard)| *hazard)
        .unwrap_or(HazardType::Other)
}
