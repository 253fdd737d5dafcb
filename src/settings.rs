use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::geolocation::GeolocationOptions;

pub const API_BASE_URL_ENV: &str = "HAZARDWATCH_API_BASE_URL";
pub const DEBUG_ENV: &str = "HAZARDWATCH_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub geolocation_timeout_ms: u64,
    pub geolocation_max_age_ms: u64,
    pub recent_reports_limit: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            request_timeout_ms: 30_000,
            geolocation_timeout_ms: 10_000,
            geolocation_max_age_ms: 300_000,
            recent_reports_limit: 10,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn geolocation_options(&self) -> GeolocationOptions {
        GeolocationOptions {
            timeout: Duration::from_millis(self.geolocation_timeout_ms),
            max_cache_age: Duration::from_millis(self.geolocation_max_age_ms),
        }
    }

    /// Applies `HAZARDWATCH_API_BASE_URL` when it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(API_BASE_URL_ENV).ok())
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.map(|url| url.trim().to_string()) {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }
}

/// `HAZARDWATCH_DEBUG=1` (or `true`) turns on debug output.
pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            ClientSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> ClientSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: ClientSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: ClientSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn persist(&self, data: &ClientSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
