use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

const ENABLE_LOGS: bool = true;

use crate::{
    evidence::{validate, EvidenceBundle, HazardType, Violation},
    geolocation::{GeolocationError, GeolocationOptions, GeolocationResolver},
    log_info, log_warn,
};

use super::{ApiError, AttachmentReadError, ReportApi, SubmitPayload};

/// Why a report did not reach the backend, or why the backend turned it down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("report is incomplete: {}", join_violations(.0))]
    ValidationFailed(Vec<Violation>),
    #[error("location is required: {0}")]
    LocationRequired(GeolocationError),
    #[error("{0}")]
    AttachmentUnreadable(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    ValidationRejected(String),
    #[error("{0}")]
    ServerError(String),
    #[error("{0}")]
    NetworkUnreachable(String),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ApiError> for SubmitError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(message) => SubmitError::Unauthorized(message),
            ApiError::Rejected { message, .. } => SubmitError::ValidationRejected(message),
            ApiError::InvalidRequest(message) => SubmitError::ValidationRejected(message),
            ApiError::Server { message, .. } => SubmitError::ServerError(message),
            ApiError::InvalidResponse(message) => SubmitError::ServerError(message),
            ApiError::Network(message) => SubmitError::NetworkUnreachable(message),
        }
    }
}

impl From<AttachmentReadError> for SubmitError {
    fn from(err: AttachmentReadError) -> Self {
        SubmitError::AttachmentUnreadable(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub report_id: String,
    pub message: Option<String>,
}

/// Validates, locates, packs and sends one report.
pub struct ReportSubmissionClient {
    api: Arc<dyn ReportApi>,
    geolocation: Arc<GeolocationResolver>,
    geolocation_options: GeolocationOptions,
}

impl ReportSubmissionClient {
    pub fn new(api: Arc<dyn ReportApi>, geolocation: Arc<GeolocationResolver>) -> Self {
        Self {
            api,
            geolocation,
            geolocation_options: GeolocationOptions::default(),
        }
    }

    pub fn with_geolocation_options(mut self, options: GeolocationOptions) -> Self {
        self.geolocation_options = options;
        self
    }

    /// Makes at most one network call. The bundle is left untouched either way.
    pub async fn submit(&self, bundle: &EvidenceBundle) -> Result<ReportReceipt, SubmitError> {
        let violations = validate(bundle);
        if !violations.is_empty() {
            log_info!("Submit blocked by {} violation(s)", violations.len());
            return Err(SubmitError::ValidationFailed(violations));
        }

        let coordinates = match bundle.coordinates() {
            Some(coordinates) => coordinates,
            None => self
                .geolocation
                .resolve_current_position(self.geolocation_options)
                .await
                .map_err(SubmitError::LocationRequired)?,
        };

        let hazard_type = bundle.hazard_type().unwrap_or(HazardType::Other);
        let payload = SubmitPayload::assemble(bundle, hazard_type, coordinates).await?;

        let response = self.api.submit_report(payload).await.and_then(|response| {
            match response.report_id {
                Some(report_id) if !report_id.is_empty() => Ok(ReportReceipt {
                    report_id,
                    message: response.message,
                }),
                _ => Err(ApiError::InvalidResponse(
                    "submit succeeded without a report_id".to_string(),
                )),
            }
        });
        let receipt = response.map_err(|err| {
            log_warn!("Report submission failed: {err}");
            SubmitError::from(err)
        })?;

        log_info!("Report submitted as {}", receipt.report_id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{MockReportApi, SubmitResponse},
        evidence::{MediaAsset, MediaKind},
        geolocation::{Coordinates, LocationProvider, MockLocationProvider, PositionFix},
    };
    use async_trait::async_trait;
    use std::time::Duration;

    fn ready_bundle() -> EvidenceBundle {
        let mut bundle = EvidenceBundle::new();
        bundle.set_category("rip_current");
        bundle.set_description("Strong rip current near the north pier, two swimmers pulled out");
        bundle.attach_photo(MediaAsset::from_bytes("pier.jpg", "image/jpeg", vec![0xff; 32]));
        bundle.attach_voice_clip(MediaAsset::from_bytes(
            "voice-report-1.wav",
            "audio/wav",
            vec![0; 64],
        ));
        bundle
    }

    fn fixed_resolver(lat: f64, lng: f64) -> Arc<GeolocationResolver> {
        let mut provider = MockLocationProvider::new();
        provider.expect_current_position().returning(move || {
            Ok(PositionFix {
                coordinates: Coordinates::new(lat, lng),
                accuracy_m: Some(12.0),
            })
        });
        Arc::new(GeolocationResolver::new(Arc::new(provider)))
    }

    struct SlowProvider;

    #[async_trait]
    impl LocationProvider for SlowProvider {
        async fn current_position(&self) -> Result<PositionFix, GeolocationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(GeolocationError::PositionUnavailable)
        }
    }

    #[tokio::test]
    async fn sends_one_payload_with_mapped_type_and_resolved_position() {
        // Arrange
        let mut api = MockReportApi::new();
        api.expect_submit_report()
            .withf(|payload: &SubmitPayload| {
                payload.hazard_type == HazardType::RipCurrent
                    && payload.coordinates == Coordinates::new(19.07, 72.87)
                    && payload.files.len() == 2
                    && payload.files[0].kind == MediaKind::Image
                    && payload.files[1].kind == MediaKind::Audio
            })
            .times(1)
            .return_once(|_| {
                Ok(SubmitResponse {
                    report_id: Some("r-1".into()),
                    message: Some("received".into()),
                })
            });

        let client = ReportSubmissionClient::new(Arc::new(api), fixed_resolver(19.07, 72.87));
        let bundle = ready_bundle();

        // Act
        let receipt = client.submit(&bundle).await.unwrap();

        // Assert
        assert_eq!(receipt.report_id, "r-1");
        assert_eq!(bundle.attachment_count(), 2);
    }

    #[tokio::test]
    async fn six_photos_never_reach_the_network() {
        let mut api = MockReportApi::new();
        api.expect_submit_report().times(0);

        let mut bundle = ready_bundle();
        for i in 0..5 {
            bundle.attach_photo(MediaAsset::from_bytes(
                format!("extra-{i}.jpg"),
                "image/jpeg",
                vec![1; 4],
            ));
        }

        let client = ReportSubmissionClient::new(Arc::new(api), fixed_resolver(0.0, 0.0));
        let err = client.submit(&bundle).await.unwrap_err();

        match err {
            SubmitError::ValidationFailed(violations) => {
                assert!(violations.contains(&Violation::TooManyPhotos { max: 5, actual: 6 }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn location_timeout_blocks_submit() {
        let mut api = MockReportApi::new();
        api.expect_submit_report().times(0);

        let resolver = Arc::new(GeolocationResolver::new(Arc::new(SlowProvider)));
        let client = ReportSubmissionClient::new(Arc::new(api), resolver);

        let err = client.submit(&ready_bundle()).await.unwrap_err();
        assert_eq!(err, SubmitError::LocationRequired(GeolocationError::Timeout));
    }

    #[tokio::test]
    async fn denied_location_is_reported() {
        let mut provider = MockLocationProvider::new();
        provider
            .expect_current_position()
            .times(1)
            .return_once(|| Err(GeolocationError::PermissionDenied));
        let mut api = MockReportApi::new();
        api.expect_submit_report().times(0);

        let client = ReportSubmissionClient::new(
            Arc::new(api),
            Arc::new(GeolocationResolver::new(Arc::new(provider))),
        );

        let err = client.submit(&ready_bundle()).await.unwrap_err();
        assert_eq!(
            err,
            SubmitError::LocationRequired(GeolocationError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn bundle_coordinates_skip_the_resolver() {
        let mut api = MockReportApi::new();
        api.expect_submit_report()
            .withf(|payload: &SubmitPayload| payload.coordinates == Coordinates::new(8.5, 76.9))
            .times(1)
            .return_once(|_| {
                Ok(SubmitResponse {
                    report_id: Some("r-3".into()),
                    message: None,
                })
            });

        let client = ReportSubmissionClient::new(
            Arc::new(api),
            Arc::new(GeolocationResolver::unsupported()),
        );
        let mut bundle = ready_bundle();
        bundle.set_coordinates(Coordinates::new(8.5, 76.9));

        assert!(client.submit(&bundle).await.is_ok());
    }

    #[tokio::test]
    async fn unmapped_category_goes_out_as_other() {
        let mut api = MockReportApi::new();
        api.expect_submit_report()
            .withf(|payload: &SubmitPayload| payload.hazard_type == HazardType::Other)
            .times(1)
            .return_once(|_| {
                Ok(SubmitResponse {
                    report_id: Some("r-2".into()),
                    message: None,
                })
            });

        let client = ReportSubmissionClient::new(Arc::new(api), fixed_resolver(1.0, 2.0));
        let mut bundle = ready_bundle();
        bundle.set_category("jellyfish swarm");

        assert!(client.submit(&bundle).await.is_ok());
    }

    #[tokio::test]
    async fn backend_failures_are_classified() {
        let cases = [
            (
                ApiError::Unauthorized("please sign in".into()),
                SubmitError::Unauthorized("please sign in".into()),
            ),
            (
                ApiError::Rejected {
                    status: 422,
                    message: "field required".into(),
                },
                SubmitError::ValidationRejected("field required".into()),
            ),
            (
                ApiError::Server {
                    status: 503,
                    message: "down".into(),
                },
                SubmitError::ServerError("down".into()),
            ),
            (
                ApiError::Network("offline".into()),
                SubmitError::NetworkUnreachable("offline".into()),
            ),
        ];

        for (api_error, expected) in cases {
            let mut api = MockReportApi::new();
            api.expect_submit_report()
                .times(1)
                .return_once(move |_| Err(api_error));

            let client = ReportSubmissionClient::new(Arc::new(api), fixed_resolver(1.0, 2.0));
            assert_eq!(client.submit(&ready_bundle()).await.unwrap_err(), expected);
        }
    }

    #[tokio::test]
    async fn success_without_report_id_is_a_server_error() {
        for report_id in [None, Some(String::new())] {
            let mut api = MockReportApi::new();
            api.expect_submit_report().times(1).return_once(move |_| {
                Ok(SubmitResponse {
                    report_id,
                    message: Some("ok".into()),
                })
            });

            let client = ReportSubmissionClient::new(Arc::new(api), fixed_resolver(1.0, 2.0));
            let err = client.submit(&ready_bundle()).await.unwrap_err();

            assert!(
                matches!(err, SubmitError::ServerError(ref message) if message.contains("report_id"))
            );
        }
    }
}
