pub mod auth;
pub mod classify;
pub mod client;
pub mod payload;
pub mod responses;
pub mod submission;

use async_trait::async_trait;
use thiserror::Error;

use crate::{evidence::DraftReport, hotspots::RawHotspot};

pub use auth::{map_user_type_to_role, Credentials, Registration};
pub use client::ApiClient;
pub use payload::{AttachmentReadError, SubmitPayload, UploadFile};
pub use responses::{RecentReport, SubmitResponse};
pub use submission::{ReportReceipt, ReportSubmissionClient, SubmitError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Network(String),
    #[error("unexpected response from server: {0}")]
    InvalidResponse(String),
    #[error("could not build request: {0}")]
    InvalidRequest(String),
}

/// The hazard backend as the client core sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportApi: Send + Sync {
    async fn submit_report(&self, payload: SubmitPayload) -> Result<SubmitResponse, ApiError>;

    async fn save_draft(&self, draft: DraftReport) -> Result<(), ApiError>;

    async fn fetch_hotspots(&self) -> Result<Vec<RawHotspot>, ApiError>;

    async fn fetch_recent_reports(&self, limit: usize) -> Result<Vec<RecentReport>, ApiError>;
}
