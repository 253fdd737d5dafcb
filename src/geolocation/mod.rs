use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_millis(300_000);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A position reported by the platform, with its horizontal accuracy when known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinates: Coordinates,
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("location access denied by user")]
    PermissionDenied,
    #[error("location information is unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
}

/// The platform location service. One call is one position request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<PositionFix, GeolocationError>;
}

/// Always answers with the same position. Used when the observer types coordinates in
/// by hand or the host has a fixed install location.
pub struct FixedLocationProvider {
    fix: PositionFix,
}

impl FixedLocationProvider {
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            fix: PositionFix {
                coordinates,
                accuracy_m: None,
            },
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self) -> Result<PositionFix, GeolocationError> {
        Ok(self.fix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_cache_age: DEFAULT_MAX_CACHE_AGE,
        }
    }
}

/// One-shot position lookup with a deadline. Never retries on its own.
pub struct GeolocationResolver {
    provider: Option<Arc<dyn LocationProvider>>,
    last_fix: Mutex<Option<(PositionFix, Instant)>>,
}

impl GeolocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider: Some(provider),
            last_fix: Mutex::new(None),
        }
    }

    /// A resolver for hosts without any location service.
    pub fn unsupported() -> Self {
        Self {
            provider: None,
            last_fix: Mutex::new(None),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn resolve_current_position(
        &self,
        options: GeolocationOptions,
    ) -> Result<Coordinates, GeolocationError> {
        self.resolve_current_fix(options)
            .await
            .map(|fix| fix.coordinates)
    }

    /// Returns a fix no older than `max_cache_age`, asking the provider only when the
    /// remembered one has gone stale. The provider gets `timeout` to answer.
    pub async fn resolve_current_fix(
        &self,
        options: GeolocationOptions,
    ) -> Result<PositionFix, GeolocationError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(GeolocationError::Unsupported)?;

        if let Some(fix) = self.cached_fix(options.max_cache_age) {
            log_debug!("Using cached position fix");
            return Ok(fix);
        }

        let fix = match tokio::time::timeout(options.timeout, provider.current_position()).await
        {
            Ok(Ok(fix)) => fix,
            Ok(Err(err)) => {
                log_warn!("Position request failed: {err}");
                return Err(err);
            }
            Err(_) => {
                log_warn!(
                    "Position request exceeded {}ms",
                    options.timeout.as_millis()
                );
                return Err(GeolocationError::Timeout);
            }
        };

        match fix.accuracy_m {
            Some(accuracy) => log_debug!("Position fix within {accuracy:.0}m"),
            None => log_debug!("Position fix without accuracy"),
        }
        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((fix, Instant::now()));

        Ok(fix)
    }

    fn cached_fix(&self, max_age: Duration) -> Option<PositionFix> {
        let guard = self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        match *guard {
            Some((fix, taken_at)) if taken_at.elapsed() <= max_age => Some(fix),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverAnswers;

    #[async_trait]
    impl LocationProvider for NeverAnswers {
        async fn current_position(&self) -> Result<PositionFix, GeolocationError> {
            std::future::pending().await
        }
    }

    fn fix(lat: f64, lng: f64) -> PositionFix {
        PositionFix {
            coordinates: Coordinates::new(lat, lng),
            accuracy_m: Some(12.0),
        }
    }

    #[tokio::test]
    async fn unsupported_without_provider() {
        let resolver = GeolocationResolver::unsupported();
        let result = resolver
            .resolve_current_position(GeolocationOptions::default())
            .await;
        assert_eq!(result, Err(GeolocationError::Unsupported));
        assert!(!resolver.is_supported());
    }

    #[tokio::test]
    async fn passes_provider_errors_through() {
        let mut provider = MockLocationProvider::new();
        provider
            .expect_current_position()
            .times(1)
            .returning(|| Err(GeolocationError::PermissionDenied));

        let resolver = GeolocationResolver::new(Arc::new(provider));
        let result = resolver
            .resolve_current_position(GeolocationOptions::default())
            .await;

        assert_eq!(result, Err(GeolocationError::PermissionDenied));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_deadline() {
        let resolver = GeolocationResolver::new(Arc::new(NeverAnswers));
        let started = Instant::now();

        let result = resolver
            .resolve_current_position(GeolocationOptions::default())
            .await;

        assert_eq!(result, Err(GeolocationError::Timeout));
        assert!(started.elapsed() >= DEFAULT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn reuses_fresh_fix_and_refreshes_stale_one() {
        let mut provider = MockLocationProvider::new();
        let mut calls = 0;
        provider.expect_current_position().times(2).returning(move || {
            calls += 1;
            Ok(fix(19.0 + calls as f64, 72.87))
        });

        let resolver = GeolocationResolver::new(Arc::new(provider));
        let options = GeolocationOptions::default();

        let first = resolver.resolve_current_position(options).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let cached = resolver.resolve_current_position(options).await.unwrap();
        assert_eq!(first, cached);

        tokio::time::advance(DEFAULT_MAX_CACHE_AGE).await;
        let refreshed = resolver.resolve_current_position(options).await.unwrap();
        assert_eq!(refreshed, Coordinates::new(21.0, 72.87));
    }

    #[tokio::test(start_paused = true)]
    async fn fix_keeps_its_accuracy_through_the_cache() {
        let mut provider = MockLocationProvider::new();
        provider
            .expect_current_position()
            .times(1)
            .returning(|| Ok(fix(15.49, 73.82)));

        let resolver = GeolocationResolver::new(Arc::new(provider));
        let options = GeolocationOptions::default();

        let fresh = resolver.resolve_current_fix(options).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let cached = resolver.resolve_current_fix(options).await.unwrap();

        assert_eq!(fresh.accuracy_m, Some(12.0));
        assert_eq!(cached, fresh);
    }

    #[tokio::test]
    async fn fixed_provider_answers_immediately() {
        let resolver =
            GeolocationResolver::new(Arc::new(FixedLocationProvider::new(Coordinates::new(
                19.07, 72.87,
            ))));
        let coords = resolver
            .resolve_current_position(GeolocationOptions::default())
            .await
            .unwrap();
        assert_eq!(coords, Coordinates::new(19.07, 72.87));

        let fix = resolver
            .resolve_current_fix(GeolocationOptions::default())
            .await
            .unwrap();
        assert_eq!(fix.accuracy_m, None);
    }
}
