//! Dashboard filter state and change debouncing.
//!
//! `FilterState` stores every edit immediately so inputs stay responsive;
//! `Debouncer` decides when an edit is allowed to reach the network.

mod debounce;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};

use chrono::NaiveDate;
use menurank_model::{parse_date, DateRange, ProductId, RankingParams};
use thiserror::Error;

pub const MIN_TOP_K: u32 = 1;
pub const MAX_TOP_K: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// What a setter touched, used to pick the minimal refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Date range, top-K or normalize flag
    Params,
    /// Free-text table query (client-side only)
    Query,
    Selection,
    Unchanged,
}

/// The user's current filter choices.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    range: DateRange,
    top_k: u32,
    normalize: bool,
    query: String,
    selected_id: Option<ProductId>,
}

impl Default for FilterState {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap_or_default();
        Self {
            range: DateRange::spanning(start, end),
            top_k: 10,
            normalize: true,
            query: String::new(),
            selected_id: None,
        }
    }
}

impl FilterState {
    pub fn new(range: DateRange, top_k: u32) -> Self {
        Self {
            range,
            top_k: clamp_top_k(i64::from(top_k)),
            ..Default::default()
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_id(&self) -> Option<ProductId> {
        self.selected_id
    }

    /// Parameters for the ranking, export and report endpoints.
    pub fn ranking_params(&self) -> RankingParams {
        RankingParams::new(self.range, self.top_k, self.normalize)
    }

    /// Set the start date. A start past the end date drags the end along.
    pub fn set_start_date(&mut self, input: &str) -> Result<FilterChange, FilterError> {
        let start = parse_date(input).ok_or_else(|| FilterError::InvalidDate(input.to_string()))?;
        let end = self.range.end().max(start);
        Ok(self.replace_range(start, end))
    }

    /// Set the end date. An end before the start date drags the start along.
    pub fn set_end_date(&mut self, input: &str) -> Result<FilterChange, FilterError> {
        let end = parse_date(input).ok_or_else(|| FilterError::InvalidDate(input.to_string()))?;
        let start = self.range.start().min(end);
        Ok(self.replace_range(start, end))
    }

    fn replace_range(&mut self, start: NaiveDate, end: NaiveDate) -> FilterChange {
        let range = DateRange::spanning(start, end);
        if range == self.range {
            return FilterChange::Unchanged;
        }
        self.range = range;
        FilterChange::Params
    }

    /// Set top-K from raw input text. Non-numeric input means 1.
    pub fn set_top_k(&mut self, input: &str) -> FilterChange {
        let value = parse_leading_int(input).unwrap_or(i64::from(MIN_TOP_K));
        self.set_top_k_value(value)
    }

    pub fn set_top_k_value(&mut self, value: i64) -> FilterChange {
        let top_k = clamp_top_k(value);
        if top_k == self.top_k {
            return FilterChange::Unchanged;
        }
        self.top_k = top_k;
        FilterChange::Params
    }

    pub fn set_normalize(&mut self, normalize: bool) -> FilterChange {
        if normalize == self.normalize {
            return FilterChange::Unchanged;
        }
        self.normalize = normalize;
        FilterChange::Params
    }

    pub fn set_query(&mut self, query: impl Into<String>) -> FilterChange {
        let query = query.into();
        if query == self.query {
            return FilterChange::Unchanged;
        }
        self.query = query;
        FilterChange::Query
    }

    pub fn set_selected_id(&mut self, id: Option<ProductId>) -> FilterChange {
        if id == self.selected_id {
            return FilterChange::Unchanged;
        }
        self.selected_id = id;
        FilterChange::Selection
    }
}

fn clamp_top_k(value: i64) -> u32 {
    value.clamp(i64::from(MIN_TOP_K), i64::from(MAX_TOP_K)) as u32
}

/// Parse the leading integer of a number-input value ("12abc" -> 12).
fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Overlong inputs saturate; they get clamped to MAX_TOP_K anyway.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}
