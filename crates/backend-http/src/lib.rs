//! HTTP access to the ranking API.
//!
//! Provides the `RankingApi` trait and its `reqwest` implementation.
//! The orchestration core only sees the trait, so tests and other
//! transports can stand in for the real server.

use menurank_model::{
    DayRankingParams, ExportDescriptor, ExportParams, RankingParams, RankingRow, SeriesParams,
    SeriesPoint, ShareParams, ShareSlice,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API base address.
pub const API_BASE_ENV: &str = "MENURANK_API_BASE";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Errors from ranking API calls.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Expected {expected}, got {content_type:?}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    UnexpectedContent {
        expected: &'static str,
        content_type: String,
        reason: Option<String>,
    },

    #[error("Backend not available")]
    Unavailable,
}

/// Trait for ranking data sources.
///
/// Mirrors the `/ranking` endpoints one method per route.
pub trait RankingApi {
    /// Ranked products for a date window, ordered by rank.
    fn ranking(
        &self,
        params: &RankingParams,
    ) -> impl Future<Output = Result<Vec<RankingRow>, BackendError>> + Send;

    /// Ranked products for a single day.
    fn ranking_by_day(
        &self,
        params: &DayRankingParams,
    ) -> impl Future<Output = Result<Vec<RankingRow>, BackendError>> + Send;

    /// Daily raw scores of one product, ordered by date.
    fn series(
        &self,
        params: &SeriesParams,
    ) -> impl Future<Output = Result<Vec<SeriesPoint>, BackendError>> + Send;

    /// Units sold per product in the top-K cohort.
    fn share(
        &self,
        params: &ShareParams,
    ) -> impl Future<Output = Result<Vec<ShareSlice>, BackendError>> + Send;

    /// Ask the server to write a CSV export.
    fn export_csv(
        &self,
        params: &ExportParams,
    ) -> impl Future<Output = Result<ExportDescriptor, BackendError>> + Send;

    /// Generate a PDF report and return its bytes.
    fn report(
        &self,
        params: &ExportParams,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    /// Check if the API is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// Ranking API client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let base_url = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }
}

/// Ranking API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRankingApi {
    config: ApiConfig,
    client: reqwest::Client,
}

impl HttpRankingApi {
    pub fn new(config: ApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).query(query)
    }

    async fn send<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<reqwest::Response, BackendError> {
        let response = self
            .request(path, query)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        Ok(response)
    }

    /// GET a JSON array. A `null` body counts as empty.
    async fn get_list<T, Q>(&self, path: &str, query: &Q) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(path, query).await?;
        let rows: Option<Vec<T>> = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;
        Ok(rows.unwrap_or_default())
    }
}

impl RankingApi for HttpRankingApi {
    async fn ranking(&self, params: &RankingParams) -> Result<Vec<RankingRow>, BackendError> {
        tracing::debug!(?params, "GET /ranking/");
        self.get_list("/ranking/", params).await
    }

    async fn ranking_by_day(
        &self,
        params: &DayRankingParams,
    ) -> Result<Vec<RankingRow>, BackendError> {
        tracing::debug!(?params, "GET /ranking/by_day");
        self.get_list("/ranking/by_day", params).await
    }

    async fn series(&self, params: &SeriesParams) -> Result<Vec<SeriesPoint>, BackendError> {
        tracing::debug!(?params, "GET /ranking/series");
        self.get_list("/ranking/series", params).await
    }

    async fn share(&self, params: &ShareParams) -> Result<Vec<ShareSlice>, BackendError> {
        tracing::debug!(?params, "GET /ranking/share");
        self.get_list("/ranking/share", params).await
    }

    async fn export_csv(&self, params: &ExportParams) -> Result<ExportDescriptor, BackendError> {
        tracing::debug!(?params, "GET /ranking/export");
        let response = self.send("/ranking/export", params).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    async fn report(&self, params: &ExportParams) -> Result<Vec<u8>, BackendError> {
        tracing::debug!(?params, "GET /ranking/report");
        let response = self.send("/ranking/report", params).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        check_pdf(content_type.as_deref(), &body)?;
        Ok(body.to_vec())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Deserialize)]
struct RefusalBody {
    #[serde(default)]
    reason: Option<String>,
}

/// The report route answers with a JSON refusal instead of a PDF when the
/// window has no data.
fn check_pdf(content_type: Option<&str>, body: &[u8]) -> Result<(), BackendError> {
    let content_type = content_type.unwrap_or("");
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case(PDF_MEDIA_TYPE) {
        return Ok(());
    }

    let reason = serde_json::from_slice::<RefusalBody>(body)
        .ok()
        .and_then(|r| r.reason);
    Err(BackendError::UnexpectedContent {
        expected: PDF_MEDIA_TYPE,
        content_type: content_type.to_string(),
        reason,
    })
}
