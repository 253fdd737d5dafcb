use serde::{Deserialize, Serialize};

use crate::hotspots::{normalizer::lenient_id, RawHotspot};

/// 2xx body of `POST /reports/submit`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    pub report_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HotspotList {
    #[serde(default)]
    pub items: Vec<RawHotspot>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecentList {
    #[serde(default)]
    pub items: Vec<RawRecentReport>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRecentReport {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub hazard_type: Option<String>,
    #[serde(default)]
    pub user_description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_city: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A report card in the recent-reports feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentReport {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub city: String,
    pub thumbnail_url: Option<String>,
}

impl From<RawRecentReport> for RecentReport {
    fn from(raw: RawRecentReport) -> Self {
        Self {
            id: raw.id,
            title: raw
                .hazard_type
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| "Hazard Report".to_string()),
            description: raw.user_description.unwrap_or_default(),
            status: raw.status,
            created_at: raw.created_at,
            city: raw.user_city.unwrap_or_default(),
            thumbnail_url: raw.thumbnail_url,
        }
    }
}
