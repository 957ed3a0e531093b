//! Core domain model for the MenuRank dashboard.
//!
//! This crate defines the types exchanged with the ranking API:
//! - `RankingRow`: One ranked product for a date window
//! - `SeriesPoint`: One day of a single product's score series
//! - `ShareSlice`: Units sold by one product in the top-K cohort
//! - `ExportDescriptor`: Server-side CSV export outcome
//! - Request parameter structs, one per endpoint

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire format for every date the API accepts or returns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identifier of a menu product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar window, always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DateRangeError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering both dates, whichever order they come in.
    pub fn spanning(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// The three independently fetched views the dashboard keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Ranking,
    Share,
    Series,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ranking => "ranking",
            Self::Share => "share",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked product for one date window.
///
/// `score_norm` is scaled by the server over the top-K cohort and is only
/// present when the request asked for normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub product_id: ProductId,

    /// Dense 1..N ordering within the response
    pub rank: u32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub price: f64,

    /// Margin ratio, nominally in [0, 1]
    #[serde(default)]
    pub margin: f64,

    pub score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_norm: Option<f64>,
}

impl RankingRow {
    /// Create a minimal row for testing.
    pub fn new(product_id: impl Into<ProductId>, rank: u32, name: impl Into<String>, score: f64) -> Self {
        Self {
            product_id: product_id.into(),
            rank,
            name: Some(name.into()),
            price: 0.0,
            margin: 0.0,
            score,
            score_norm: None,
        }
    }

    /// Name shown in the table; missing names render empty.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Score a chart should plot for the current normalize flag.
    pub fn display_score(&self, normalize: bool) -> f64 {
        match (normalize, self.score_norm) {
            (true, Some(norm)) => norm,
            _ => self.score,
        }
    }
}

/// One day of a product's score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub score: f64,

    /// Window-local 0-100 score, filled in client-side
    #[serde(default)]
    pub score_norm: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, score: f64) -> Self {
        Self {
            date,
            score,
            score_norm: 0.0,
        }
    }

    pub fn display_score(&self, normalize: bool) -> f64 {
        if normalize {
            self.score_norm
        } else {
            self.score
        }
    }
}

/// Units sold by one product within the top-K share breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSlice {
    pub product_id: ProductId,

    #[serde(default)]
    pub name: Option<String>,

    pub sales_count: u64,
}

impl ShareSlice {
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, sales_count: u64) -> Self {
        Self {
            product_id: product_id.into(),
            name: Some(name.into()),
            sales_count,
        }
    }
}

/// Helpers over a share response. Slices sum to the cohort's units, not 100%.
pub trait ShareBreakdown {
    fn total_units(&self) -> u64;

    /// Fraction of the cohort total held by `slice`; 0 for an empty cohort.
    fn fraction(&self, slice: &ShareSlice) -> f64;
}

impl ShareBreakdown for [ShareSlice] {
    fn total_units(&self) -> u64 {
        self.iter().map(|s| s.sales_count).sum()
    }

    fn fraction(&self, slice: &ShareSlice) -> f64 {
        let total = self.total_units();
        if total == 0 {
            0.0
        } else {
            slice.sales_count as f64 / total as f64
        }
    }
}

/// Server reply to a CSV export request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportDescriptor {
    pub saved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rows written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,

    /// Why nothing was saved (e.g. "no data in range")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Query parameters for `/ranking/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub top_k: u32,
    pub normalize: bool,
}

/// Query parameters for `/ranking/by_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayRankingParams {
    pub day: NaiveDate,
    pub top_k: u32,
    pub normalize: bool,
}

/// Query parameters for `/ranking/series`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesParams {
    pub product_id: ProductId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Query parameters for `/ranking/share`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub top_k: u32,
}

/// Query parameters shared by `/ranking/export` and `/ranking/report`.
pub type ExportParams = RankingParams;

impl RankingParams {
    pub fn new(range: DateRange, top_k: u32, normalize: bool) -> Self {
        Self {
            start_date: range.start(),
            end_date: range.end(),
            top_k,
            normalize,
        }
    }

    pub fn share(&self) -> ShareParams {
        ShareParams {
            start_date: self.start_date,
            end_date: self.end_date,
            top_k: self.top_k,
        }
    }

    pub fn series(&self, product_id: ProductId) -> SeriesParams {
        SeriesParams {
            product_id,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
