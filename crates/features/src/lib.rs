//! Pure, synchronous transforms over fetched dashboard data.
//!
//! - Window-local score normalization for a product's series
//! - Client-side substring filtering of the ranking table
//!
//! Nothing here touches the network or suspends.

use menurank_model::{RankingRow, SeriesPoint};

/// Min/max scaling of raw scores onto 0-100 with one decimal.
///
/// Fitted per product and per date window. This is unrelated to the
/// `score_norm` the server attaches to ranking rows, which is scaled over
/// the top-K cohort instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNormalizer {
    min: f64,
    max: f64,
}

impl ScoreNormalizer {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Fit over the finite scores of a window. `None` when there are none.
    pub fn fit(scores: &[f64]) -> Option<Self> {
        let mut finite = scores.iter().copied().filter(|s| s.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
        Some(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Scale one score. A flat window divides by 1 instead of 0.
    pub fn apply(&self, score: f64) -> f64 {
        let denom = match self.max - self.min {
            d if d == 0.0 => 1.0,
            d => d,
        };
        // f64::round is half away from zero
        (((score - self.min) / denom) * 1000.0).round() / 10.0
    }

    /// Normalize a whole window. Non-finite inputs map to NaN.
    pub fn normalize(scores: &[f64]) -> Vec<f64> {
        match Self::fit(scores) {
            Some(n) => scores
                .iter()
                .map(|&s| if s.is_finite() { n.apply(s) } else { f64::NAN })
                .collect(),
            None => vec![f64::NAN; scores.len()],
        }
    }
}

/// Fill in `score_norm` for every point of a series window.
pub fn normalize_series(mut points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
    if points.is_empty() {
        return points;
    }
    let scores: Vec<f64> = points.iter().map(|p| p.score).collect();
    for (point, norm) in points.iter_mut().zip(ScoreNormalizer::normalize(&scores)) {
        point.score_norm = norm;
    }
    points
}

/// Rows whose name contains `query`, ignoring case. Ranks are left as the
/// server sent them.
pub fn filter_rows<'a>(rows: &'a [RankingRow], query: &str) -> Vec<&'a RankingRow> {
    if query.is_empty() {
        return rows.iter().collect();
    }
    let needle = query.to_lowercase();
    rows.iter()
        .filter(|row| row.display_name().to_lowercase().contains(&needle))
        .collect()
}
