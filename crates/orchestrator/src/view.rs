//! Read-only state handed to renderers.

use menurank_features::filter_rows;
use menurank_filters::FilterState;
use menurank_model::{ProductId, QueryKind, RankingParams, RankingRow, SeriesPoint, ShareSlice};

/// One flag per query kind, true while its latest request is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub ranking: bool,
    pub share: bool,
    pub series: bool,
}

impl LoadingFlags {
    pub fn get(&self, kind: QueryKind) -> bool {
        match kind {
            QueryKind::Ranking => self.ranking,
            QueryKind::Share => self.share,
            QueryKind::Series => self.series,
        }
    }

    pub(crate) fn set(&mut self, kind: QueryKind, value: bool) {
        match kind {
            QueryKind::Ranking => self.ranking = value,
            QueryKind::Share => self.share = value,
            QueryKind::Series => self.series = value,
        }
    }

    pub fn any(&self) -> bool {
        self.ranking || self.share || self.series
    }
}

/// What the ranking table should show.
#[derive(Debug, Clone, PartialEq)]
pub enum TableView<'a> {
    NoRecords,
    Rows(Vec<&'a RankingRow>),
}

/// Parameters the fetched collections currently correspond to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SyncPoint {
    pub(crate) params: RankingParams,
    pub(crate) selected: Option<ProductId>,
}

/// Filter state plus the three fetched collections.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    pub(crate) filters: FilterState,
    /// Query the table is filtered by, trails `filters.query()` by the debounce
    pub(crate) applied_query: String,
    pub(crate) rows: Vec<RankingRow>,
    pub(crate) series: Vec<SeriesPoint>,
    pub(crate) share: Vec<ShareSlice>,
    pub(crate) loading: LoadingFlags,
    pub(crate) synced: Option<SyncPoint>,
}

impl ViewModel {
    pub(crate) fn new(filters: FilterState) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn rows(&self) -> &[RankingRow] {
        &self.rows
    }

    /// Series of the selected product, with window-local `score_norm`.
    pub fn series(&self) -> &[SeriesPoint] {
        &self.series
    }

    pub fn share(&self) -> &[ShareSlice] {
        &self.share
    }

    pub fn loading(&self) -> LoadingFlags {
        self.loading
    }

    pub fn selected_id(&self) -> Option<ProductId> {
        self.filters.selected_id()
    }

    pub fn selected_row(&self) -> Option<&RankingRow> {
        let id = self.selected_id()?;
        self.rows.iter().find(|r| r.product_id == id)
    }

    /// Name of the selected product, `-` when unknown.
    pub fn selected_name(&self) -> &str {
        match self.selected_row().and_then(|r| r.name.as_deref()) {
            Some(name) if !name.is_empty() => name,
            _ => "-",
        }
    }

    pub fn applied_query(&self) -> &str {
        &self.applied_query
    }

    pub fn visible_rows(&self) -> Vec<&RankingRow> {
        filter_rows(&self.rows, &self.applied_query)
    }

    pub fn table(&self) -> TableView<'_> {
        let rows = self.visible_rows();
        if rows.is_empty() {
            TableView::NoRecords
        } else {
            TableView::Rows(rows)
        }
    }

    pub(crate) fn contains(&self, id: ProductId) -> bool {
        self.rows.iter().any(|r| r.product_id == id)
    }

    pub(crate) fn top_ranked(&self) -> Option<ProductId> {
        self.rows.iter().min_by_key(|r| r.rank).map(|r| r.product_id)
    }
}
