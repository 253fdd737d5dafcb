pub mod api;
pub mod capture;
pub mod evidence;
pub mod geolocation;
pub mod hotspots;
pub mod session;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;

use api::{
    ApiClient, ApiError, RecentReport, ReportApi, ReportReceipt, ReportSubmissionClient,
    SubmitError,
};
use capture::{Microphone, VoiceRecorder};
use evidence::EvidenceBundle;
use geolocation::GeolocationResolver;
use hotspots::NormalizedHotspot;
use session::SessionStore;
use settings::{ClientSettings, SettingsStore};

/// The client core wired together: one recorder, one submission pipeline, one backend.
pub struct HazardWatch {
    settings: ClientSettings,
    session: SessionStore,
    api: Arc<dyn ReportApi>,
    recorder: VoiceRecorder,
    submission: ReportSubmissionClient,
}

impl HazardWatch {
    pub fn new(
        settings: ClientSettings,
        session: SessionStore,
        api: Arc<dyn ReportApi>,
        geolocation: Arc<GeolocationResolver>,
        microphone: Arc<dyn Microphone>,
    ) -> Self {
        let submission = ReportSubmissionClient::new(api.clone(), geolocation)
            .with_geolocation_options(settings.geolocation_options());

        Self {
            settings,
            session,
            api,
            recorder: VoiceRecorder::new(microphone),
            submission,
        }
    }

    /// Talks to the backend over HTTP.
    pub fn connect(
        settings: ClientSettings,
        geolocation: Arc<GeolocationResolver>,
        microphone: Arc<dyn Microphone>,
    ) -> anyhow::Result<Self> {
        let session = SessionStore::new();
        let api = ApiClient::new(&settings, session.clone())?;
        Ok(Self::new(settings, session, Arc::new(api), geolocation, microphone))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn recorder(&self) -> &VoiceRecorder {
        &self.recorder
    }

    /// Moves a finished recording into the bundle. Returns whether there was one.
    pub async fn attach_recorded_clip(&self, bundle: &mut EvidenceBundle) -> bool {
        match self.recorder.take_clip().await {
            Some(clip) => {
                bundle.attach_voice_clip(clip);
                true
            }
            None => false,
        }
    }

    /// Submits the bundle and clears it on success. On failure it is left as it was so the
    /// observer can fix it and retry.
    pub async fn submit_report(
        &self,
        bundle: &mut EvidenceBundle,
    ) -> Result<ReportReceipt, SubmitError> {
        let receipt = self.submission.submit(bundle).await?;
        bundle.clear();
        self.recorder.discard_clip().await;
        Ok(receipt)
    }

    pub async fn save_draft(&self, bundle: &EvidenceBundle) -> Result<(), ApiError> {
        self.api.save_draft(bundle.to_draft()).await
    }

    pub async fn refresh_hotspots(&self) -> Result<Vec<NormalizedHotspot>, ApiError> {
        let raw = self.api.fetch_hotspots().await?;
        Ok(hotspots::normalize_all(raw))
    }

    pub async fn recent_reports(&self) -> Result<Vec<RecentReport>, ApiError> {
        self.api
            .fetch_recent_reports(self.settings.recent_reports_limit)
            .await
    }

    pub async fn shutdown(&self) {
        self.recorder.shutdown().await;
    }
}

fn settings_path() -> PathBuf {
    std::env::var_os("HAZARDWATCH_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("hazardwatch-settings.json"))
}

#[cfg(feature = "device-capture")]
fn default_microphone() -> Arc<dyn Microphone> {
    Arc::new(capture::CpalMicrophone::new())
}

#[cfg(not(feature = "device-capture"))]
fn default_microphone() -> Arc<dyn Microphone> {
    Arc::new(capture::NoMicrophone)
}

/// Loads settings, connects, and prints the current hotspot map and report feed.
pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if settings::debug_mode() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    log::info!("HazardWatch starting up...");

    let store = SettingsStore::new(settings_path())?;
    let settings = store.settings().with_env_overrides();
    log::info!("Using backend at {}", settings.api_base_url);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let app = HazardWatch::connect(
            settings,
            Arc::new(GeolocationResolver::unsupported()),
            default_microphone(),
        )?;

        match app.refresh_hotspots().await {
            Ok(hotspots) => {
                let visible = hotspots::render(&hotspots).count();
                log::info!("{} hotspot(s) fetched, {visible} above threshold", hotspots.len());
                for visual in hotspots::render(&hotspots) {
                    log::info!(
                        "  ({:.4}, {:.4}) r={:.1}px {} {}",
                        visual.position.lat,
                        visual.position.lng,
                        visual.radius_px,
                        visual.level,
                        visual.fill_color
                    );
                }
            }
            Err(err) => log::warn!("Could not load hotspots: {err}"),
        }

        match app.recent_reports().await {
            Ok(reports) => {
                for report in reports {
                    log::info!("  {} [{}] {}", report.title, report.city, report.description);
                }
            }
            Err(err) => log::warn!("Could not load recent reports: {err}"),
        }

        app.shutdown().await;
        Ok::<_, anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{MockReportApi, SubmitResponse},
        capture::device::MockMicrophone,
        evidence::MediaAsset,
        geolocation::Coordinates,
    };

    fn app(api: MockReportApi) -> HazardWatch {
        HazardWatch::new(
            ClientSettings::default(),
            SessionStore::new(),
            Arc::new(api),
            Arc::new(GeolocationResolver::unsupported()),
            Arc::new(MockMicrophone::new()),
        )
    }

    fn bundle() -> EvidenceBundle {
        let mut bundle = EvidenceBundle::new();
        bundle.set_category("flooding");
        bundle.set_description("Sea water entering the coastal road");
        bundle.set_coordinates(Coordinates::new(13.05, 80.28));
        bundle.attach_photo(MediaAsset::from_bytes("road.jpg", "image/jpeg", vec![1; 8]));
        bundle
    }

    #[tokio::test]
    async fn successful_submit_clears_bundle() {
        let mut api = MockReportApi::new();
        api.expect_submit_report().times(1).return_once(|_| {
            Ok(SubmitResponse {
                report_id: Some("42".into()),
                message: None,
            })
        });
        let app = app(api);
        let mut bundle = bundle();

        let receipt = app.submit_report(&mut bundle).await.unwrap();

        assert_eq!(receipt.report_id, "42");
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn failed_submit_keeps_bundle() {
        let mut api = MockReportApi::new();
        api.expect_submit_report()
            .times(1)
            .return_once(|_| Err(ApiError::Network("offline".into())));
        let app = app(api);
        let mut bundle = bundle();

        let err = app.submit_report(&mut bundle).await.unwrap_err();

        assert_eq!(err, SubmitError::NetworkUnreachable("offline".into()));
        assert_eq!(bundle.attachment_count(), 1);
        assert_eq!(bundle.category(), Some("flooding"));
    }

    #[tokio::test]
    async fn draft_carries_metadata_only() {
        let mut api = MockReportApi::new();
        api.expect_save_draft()
            .withf(|draft: &evidence::DraftReport| {
                draft.attachments.len() == 1 && draft.attachments[0].file_name == "road.jpg"
            })
            .times(1)
            .return_once(|_| Ok(()));

        app(api).save_draft(&bundle()).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_normalizes_hotspots() {
        let mut api = MockReportApi::new();
        api.expect_fetch_hotspots().times(1).return_once(|| {
            Ok(serde_json::from_value(serde_json::json!([
                { "report_id": "a", "latitude": 19.0, "longitude": 72.8, "confidence": 72 },
                { "report_id": "b", "latitude": 19.1, "longitude": 72.9, "confidence": 0.2 }
            ]))
            .unwrap())
        });

        let hotspots = app(api).refresh_hotspots().await.unwrap();

        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].confidence, 0.72);
        assert_eq!(hotspots::render(&hotspots).count(), 1);
    }

    #[tokio::test]
    async fn recent_reports_use_configured_limit() {
        let mut api = MockReportApi::new();
        api.expect_fetch_recent_reports()
            .withf(|limit: &usize| *limit == 10)
            .times(1)
            .return_once(|_| Ok(vec![]));

        assert!(app(api).recent_reports().await.unwrap().is_empty());
    }
}
