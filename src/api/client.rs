use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

const ENABLE_LOGS: bool = true;

use crate::{
    evidence::DraftReport,
    hotspots::RawHotspot,
    log_info, log_warn,
    session::SessionStore,
    settings::ClientSettings,
};

use super::{
    classify::{classify_status, classify_transport},
    responses::{HotspotList, RecentList, RecentReport, SubmitResponse},
    ApiError, ReportApi, SubmitPayload,
};

/// HTTP transport for the hazard backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings, session: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.post(self.url(path)))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.get(self.url(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends once and turns every non-2xx outcome into an [`ApiError`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|err| {
            log_warn!("Request failed before a response: {err}");
            classify_transport(&err)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log_warn!("Backend answered {status}");
        Err(classify_status(status.as_u16(), &body))
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response
            .bytes()
            .await
            .map_err(|err| classify_transport(&err))?;
        serde_json::from_slice(&body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl ReportApi for ApiClient {
    async fn submit_report(&self, payload: SubmitPayload) -> Result<SubmitResponse, ApiError> {
        let file_count = payload.files.len();
        let mut request = self.post("/reports/submit");
        for (name, value) in payload.location_headers() {
            request = request.header(name, value);
        }
        let request = request.multipart(payload.into_form()?);

        log_info!("Submitting report with {file_count} attachment(s)");
        let response = self.send(request).await?;
        Self::read_json(response).await
    }

    async fn save_draft(&self, draft: DraftReport) -> Result<(), ApiError> {
        self.send(self.post("/reports/draft").json(&draft)).await?;
        Ok(())
    }

    async fn fetch_hotspots(&self) -> Result<Vec<RawHotspot>, ApiError> {
        let response = self.send(self.get("/reports/hotspots")).await?;
        let list: HotspotList = Self::read_json(response).await?;
        Ok(list.items)
    }

    async fn fetch_recent_reports(&self, limit: usize) -> Result<Vec<RecentReport>, ApiError> {
        let request = self
            .get("/reports/recent")
            .query(&[("limit", limit.to_string())]);
        let list: RecentList = Self::read_json(self.send(request).await?).await?;
        Ok(list.items.into_iter().map(RecentReport::from).collect())
    }
}
