//! CSV export and PDF report delivery.
//!
//! Both actions are read-only with respect to the dashboard: they take the
//! current request parameters and never touch filter state or fetched data.
//! Failures are returned to the caller to show as a notice.

mod sink;

pub use sink::{DirectorySink, DownloadSink, StagedFile, TransientReference};

use chrono::{DateTime, Utc};
use menurank_backend_http::{BackendError, RankingApi};
use menurank_model::{ExportDescriptor, ExportParams};
use std::fmt;
use thiserror::Error;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Csv,
    Pdf,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("CSV"),
            Self::Pdf => f.write_str("PDF"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{kind} request failed: {source}")]
    Backend {
        kind: ExportKind,
        #[source]
        source: BackendError,
    },

    #[error("CSV was not saved: {}", .reason.as_deref().unwrap_or("no reason given"))]
    NotSaved { reason: Option<String> },

    #[error("Download failed: {0}")]
    Sink(#[from] std::io::Error),
}

impl ExportError {
    pub fn kind(&self) -> ExportKind {
        match self {
            Self::Backend { kind, .. } => *kind,
            Self::NotSaved { .. } => ExportKind::Csv,
            Self::Sink(_) => ExportKind::Pdf,
        }
    }

    /// Message shown to the user for a failed export action.
    pub fn notice(&self) -> String {
        match self.kind() {
            ExportKind::Csv => format!("CSV could not be generated. {self}"),
            ExportKind::Pdf => format!("PDF could not be downloaded. {self}"),
        }
    }
}

/// A CSV written on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file: String,
    pub rows: Option<u64>,
}

impl CsvExport {
    pub fn notice(&self) -> String {
        format!("CSV saved on server: {}", self.file)
    }
}

/// How a downloaded report is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportName {
    /// `report_<start>_<end>.pdf`
    #[default]
    DateRange,
    /// `ranking_<YYYYMMDDHHMMSS>.pdf`, UTC
    Timestamp,
}

pub fn report_filename(naming: ReportName, params: &ExportParams, now: DateTime<Utc>) -> String {
    match naming {
        ReportName::DateRange => format!("report_{}_{}.pdf", params.start_date, params.end_date),
        ReportName::Timestamp => format!("ranking_{}.pdf", now.format("%Y%m%d%H%M%S")),
    }
}

/// Issues export requests against a ranking API.
pub struct ExportCoordinator<'a, A> {
    api: &'a A,
}

impl<'a, A: RankingApi> ExportCoordinator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Ask the server to save a CSV and report where it went.
    pub async fn export_csv(&self, params: &ExportParams) -> Result<CsvExport, ExportError> {
        let descriptor = self
            .api
            .export_csv(params)
            .await
            .map_err(|source| ExportError::Backend {
                kind: ExportKind::Csv,
                source,
            })?;

        match descriptor {
            ExportDescriptor {
                saved: true,
                file: Some(file),
                rows,
                ..
            } => {
                tracing::info!(file = %file, ?rows, "CSV export saved");
                Ok(CsvExport { file, rows })
            }
            ExportDescriptor { reason, .. } => {
                tracing::warn!(?reason, "CSV export not saved");
                Err(ExportError::NotSaved { reason })
            }
        }
    }

    /// Fetch the PDF report and hand it to `sink`. Returns the filename used.
    ///
    /// The staged payload is released right after the download is triggered,
    /// on success and on failure.
    pub async fn download_report<S: DownloadSink>(
        &self,
        params: &ExportParams,
        sink: &S,
        naming: ReportName,
    ) -> Result<String, ExportError> {
        let bytes = self
            .api
            .report(params)
            .await
            .map_err(|source| ExportError::Backend {
                kind: ExportKind::Pdf,
                source,
            })?;

        let filename = report_filename(naming, params, Utc::now());
        let size = bytes.len();
        let reference = TransientReference::acquire(sink, bytes, PDF_MEDIA_TYPE)?;
        let triggered = reference.trigger(&filename);
        drop(reference);
        triggered?;

        tracing::info!(filename = %filename, size, "PDF report downloaded");
        Ok(filename)
    }
}
