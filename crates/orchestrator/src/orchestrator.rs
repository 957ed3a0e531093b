//! Fetch coordination for the ranking, share and series views.
//!
//! The orchestrator owns the filter state and the fetched collections and
//! publishes them through a `watch` channel. Each query kind is fenced on its
//! own, so a slow response can never overwrite a newer one of the same kind.
//! Kinds are independent and may land in any relative order.

use crate::fence::{Fences, Ticket};
use crate::view::{SyncPoint, ViewModel};
use menurank_backend_http::{BackendError, RankingApi};
use menurank_features::normalize_series;
use menurank_filters::{FilterChange, FilterError, FilterState};
use menurank_model::{ProductId, QueryKind, RankingParams, SeriesParams, ShareParams};
use std::convert::Infallible;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Product {0} is not in the current ranking")]
    UnknownProduct(ProductId),
}

/// Which fetches a filter change calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Ranking and share, plus the series of the selection if any
    Full {
        params: RankingParams,
        selected: Option<ProductId>,
    },
    /// Only the newly selected product's series
    SeriesOnly(SeriesParams),
    /// Nothing to fetch
    Idle,
}

pub struct QueryOrchestrator<A> {
    api: A,
    state: watch::Sender<ViewModel>,
    fences: Fences,
}

impl<A: RankingApi> QueryOrchestrator<A> {
    pub fn new(api: A) -> Self {
        Self::with_filters(api, FilterState::default())
    }

    pub fn with_filters(api: A, filters: FilterState) -> Self {
        let (state, _) = watch::channel(ViewModel::new(filters));
        Self {
            api,
            state,
            fences: Fences::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewModel {
        self.state.borrow().clone()
    }

    pub fn filters(&self) -> FilterState {
        self.state.borrow().filters.clone()
    }

    pub fn selected_id(&self) -> Option<ProductId> {
        self.state.borrow().selected_id()
    }

    fn edit_filters<E>(
        &self,
        edit: impl FnOnce(&mut FilterState) -> Result<FilterChange, E>,
    ) -> Result<FilterChange, E> {
        let mut outcome = Ok(FilterChange::Unchanged);
        self.state.send_if_modified(|view| {
            outcome = edit(&mut view.filters);
            matches!(outcome, Ok(change) if change != FilterChange::Unchanged)
        });
        outcome
    }

    fn edit_infallible(&self, edit: impl FnOnce(&mut FilterState) -> FilterChange) -> FilterChange {
        match self.edit_filters(|filters| Ok::<_, Infallible>(edit(filters))) {
            Ok(change) => change,
            Err(never) => match never {},
        }
    }

    pub fn set_start_date(&self, input: &str) -> Result<FilterChange, FilterError> {
        self.edit_filters(|f| f.set_start_date(input))
    }

    pub fn set_end_date(&self, input: &str) -> Result<FilterChange, FilterError> {
        self.edit_filters(|f| f.set_end_date(input))
    }

    pub fn set_top_k(&self, input: &str) -> FilterChange {
        self.edit_infallible(|f| f.set_top_k(input))
    }

    pub fn set_top_k_value(&self, value: i64) -> FilterChange {
        self.edit_infallible(|f| f.set_top_k_value(value))
    }

    pub fn set_normalize(&self, normalize: bool) -> FilterChange {
        self.edit_infallible(|f| f.set_normalize(normalize))
    }

    pub fn set_query(&self, query: impl Into<String>) -> FilterChange {
        let query = query.into();
        self.edit_infallible(|f| f.set_query(query))
    }

    /// Select a product from the current ranking.
    pub fn set_selected_id(&self, id: ProductId) -> Result<FilterChange, SelectionError> {
        let mut outcome = Err(SelectionError::UnknownProduct(id));
        self.state.send_if_modified(|view| {
            if !view.contains(id) {
                return false;
            }
            let change = view.filters.set_selected_id(Some(id));
            outcome = Ok(change);
            change != FilterChange::Unchanged
        });
        outcome
    }

    /// Compare the current filters with what was last fetched.
    pub fn plan(&self) -> SyncPlan {
        let view = self.state.borrow();
        let params = view.filters.ranking_params();
        let selected = view.filters.selected_id();
        match view.synced {
            Some(synced) if synced.params == params => match selected {
                Some(id) if synced.selected != Some(id) => SyncPlan::SeriesOnly(params.series(id)),
                _ => SyncPlan::Idle,
            },
            _ => SyncPlan::Full { params, selected },
        }
    }

    /// Initial load: ranking, then share, then the selection's series.
    pub async fn mount(&self) {
        let params = self.mark_synced();
        tracing::debug!(?params, "mounting dashboard");

        self.load_ranking(params).await;
        self.load_share(params.share()).await;
        if let Some(id) = self.selected_id() {
            self.load_series(params.series(id)).await;
        }
    }

    /// Bring the fetched views in line with the current filters.
    pub async fn sync(&self) {
        let plan = self.plan();
        self.mark_synced();
        tracing::debug!(?plan, "syncing dashboard");

        match plan {
            SyncPlan::Full { params, selected } => {
                tokio::join!(
                    self.refresh_ranking(params),
                    self.load_share(params.share()),
                    async {
                        if let Some(id) = selected {
                            self.load_series(params.series(id)).await;
                        }
                    },
                );
            }
            SyncPlan::SeriesOnly(params) => self.load_series(params).await,
            SyncPlan::Idle => {}
        }
    }

    /// Re-fetch the ranking list alone.
    pub async fn refresh(&self) {
        let params = self.filters().ranking_params();
        self.refresh_ranking(params).await;
    }

    /// Ranking fetch, followed by a series fetch if the selection moved.
    async fn refresh_ranking(&self, params: RankingParams) {
        if let Some(id) = self.load_ranking(params).await {
            self.load_series(params.series(id)).await;
        }
    }

    /// Record the current filters as fetched and publish the table query.
    fn mark_synced(&self) -> RankingParams {
        let params = self.filters().ranking_params();
        self.state.send_modify(|view| {
            view.synced = Some(SyncPoint {
                params,
                selected: view.filters.selected_id(),
            });
            view.applied_query = view.filters.query().to_string();
        });
        params
    }

    fn begin(&self, kind: QueryKind) -> Ticket {
        let ticket = self.fences.get(kind).issue();
        self.state.send_modify(|view| view.loading.set(kind, true));
        ticket
    }

    /// Apply a response if it is still the newest of its kind.
    ///
    /// A failure empties the collection. A stale response leaves everything,
    /// including the loading flag, to the newer request.
    fn settle<T: Default, R>(
        &self,
        kind: QueryKind,
        ticket: Ticket,
        result: Result<T, BackendError>,
        apply: impl FnOnce(&mut ViewModel, T) -> R,
    ) -> Option<R> {
        self.settle_result(kind, ticket, result, |view, result| {
            apply(view, result.unwrap_or_default())
        })
    }

    /// Like `settle`, but `apply` sees the failure itself.
    fn settle_result<T, R>(
        &self,
        kind: QueryKind,
        ticket: Ticket,
        result: Result<T, BackendError>,
        apply: impl FnOnce(&mut ViewModel, Result<T, BackendError>) -> R,
    ) -> Option<R> {
        let fence = self.fences.get(kind);
        let mut applied = None;
        self.state.send_if_modified(|view| {
            if !fence.is_current(ticket) {
                tracing::debug!(%kind, seq = ticket.seq(), latest = fence.latest(), "discarding stale response");
                return false;
            }
            if let Err(err) = &result {
                tracing::warn!(%kind, seq = ticket.seq(), error = %err, "fetch failed, clearing view");
            }
            applied = Some(apply(view, result));
            view.loading.set(kind, false);
            true
        });
        applied
    }

    /// Returns the product newly selected as a consequence of the new rows.
    async fn load_ranking(&self, params: RankingParams) -> Option<ProductId> {
        let ticket = self.begin(QueryKind::Ranking);
        tracing::debug!(seq = ticket.seq(), ?params, "requesting ranking");
        let result = self.api.ranking(&params).await;

        let reselected = self.settle_result(QueryKind::Ranking, ticket, result, |view, result| {
            // A failed ranking says nothing about the selection; keep it and its series.
            let Ok(rows) = result else {
                view.rows.clear();
                return None;
            };
            view.rows = rows;
            let current = view.filters.selected_id();
            let next = current
                .filter(|id| view.contains(*id))
                .or_else(|| view.top_ranked());
            if next == current {
                return None;
            }

            tracing::debug!(from = ?current, to = ?next, "selection follows ranking");
            view.filters.set_selected_id(next);
            if let Some(synced) = view.synced.as_mut() {
                synced.selected = next;
            }
            if next.is_none() {
                // Nothing left to chart; retire any series still in flight.
                self.fences.get(QueryKind::Series).invalidate();
                view.series.clear();
                view.loading.set(QueryKind::Series, false);
            }
            next
        });
        reselected.flatten()
    }

    async fn load_share(&self, params: ShareParams) {
        let ticket = self.begin(QueryKind::Share);
        tracing::debug!(seq = ticket.seq(), ?params, "requesting share");
        let result = self.api.share(&params).await;
        self.settle(QueryKind::Share, ticket, result, |view, slices| view.share = slices);
    }

    async fn load_series(&self, params: SeriesParams) {
        let ticket = self.begin(QueryKind::Series);
        tracing::debug!(seq = ticket.seq(), ?params, "requesting series");
        let result = self.api.series(&params).await;
        self.settle(QueryKind::Series, ticket, result, |view, points| {
            if view.selected_id() == Some(params.product_id) {
                view.series = normalize_series(points);
            } else {
                tracing::debug!(product_id = %params.product_id, "series no longer selected, dropping");
            }
        });
    }
}
