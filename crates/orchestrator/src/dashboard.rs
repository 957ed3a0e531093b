//! Debounced front door to the orchestrator.
//!
//! Filter edits land in the state at once so inputs can echo them, but the
//! fetches they imply wait for a quiet period. Export actions read the
//! current filters and bypass the debounce.

use crate::orchestrator::{QueryOrchestrator, SelectionError};
use crate::view::ViewModel;
use menurank_backend_http::RankingApi;
use menurank_export::{CsvExport, DownloadSink, ExportCoordinator, ExportError, ReportName};
use menurank_filters::{Debouncer, FilterChange, FilterError, FilterState, DEFAULT_DEBOUNCE};
use menurank_model::ProductId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    pub debounce: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

pub struct Dashboard<A> {
    core: Arc<QueryOrchestrator<A>>,
    debouncer: Debouncer,
}

impl<A> Dashboard<A>
where
    A: RankingApi + Send + Sync + 'static,
{
    pub fn new(api: A) -> Self {
        Self::with_config(api, FilterState::default(), DashboardConfig::default())
    }

    pub fn with_config(api: A, filters: FilterState, config: DashboardConfig) -> Self {
        Self {
            core: Arc::new(QueryOrchestrator::with_filters(api, filters)),
            debouncer: Debouncer::new(config.debounce),
        }
    }

    pub fn core(&self) -> &QueryOrchestrator<A> {
        &self.core
    }

    pub fn view(&self) -> ViewModel {
        self.core.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.core.subscribe()
    }

    pub async fn mount(&self) {
        self.core.mount().await;
    }

    pub async fn refresh(&self) {
        self.core.refresh().await;
    }

    pub fn set_start_date(&mut self, input: &str) -> Result<FilterChange, FilterError> {
        let change = self.core.set_start_date(input)?;
        Ok(self.schedule(change))
    }

    pub fn set_end_date(&mut self, input: &str) -> Result<FilterChange, FilterError> {
        let change = self.core.set_end_date(input)?;
        Ok(self.schedule(change))
    }

    pub fn set_top_k(&mut self, input: &str) -> FilterChange {
        let change = self.core.set_top_k(input);
        self.schedule(change)
    }

    pub fn set_top_k_value(&mut self, value: i64) -> FilterChange {
        let change = self.core.set_top_k_value(value);
        self.schedule(change)
    }

    pub fn set_normalize(&mut self, normalize: bool) -> FilterChange {
        let change = self.core.set_normalize(normalize);
        self.schedule(change)
    }

    pub fn set_query(&mut self, query: impl Into<String>) -> FilterChange {
        let change = self.core.set_query(query);
        self.schedule(change)
    }

    pub fn set_selected_id(&mut self, id: ProductId) -> Result<FilterChange, SelectionError> {
        let change = self.core.set_selected_id(id)?;
        Ok(self.schedule(change))
    }

    /// True while an edit is waiting out the debounce.
    pub fn has_pending_change(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Skip the remaining quiet period and sync now.
    pub async fn flush(&mut self) {
        self.debouncer.cancel();
        self.core.sync().await;
    }

    pub async fn export_csv(&self) -> Result<CsvExport, ExportError> {
        let params = self.core.filters().ranking_params();
        ExportCoordinator::new(self.core.api()).export_csv(&params).await
    }

    pub async fn download_report<S: DownloadSink>(
        &self,
        sink: &S,
        naming: ReportName,
    ) -> Result<String, ExportError> {
        let params = self.core.filters().ranking_params();
        ExportCoordinator::new(self.core.api())
            .download_report(&params, sink, naming)
            .await
    }

    fn schedule(&mut self, change: FilterChange) -> FilterChange {
        if change == FilterChange::Unchanged {
            return change;
        }
        tracing::trace!(?change, delay = ?self.debouncer.delay(), "scheduling sync");
        let core = Arc::clone(&self.core);
        self.debouncer.schedule(move || {
            tokio::spawn(async move { core.sync().await });
        });
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{menu, Call, ScriptedApi};
    use menurank_model::ExportDescriptor;
    use pretty_assertions::assert_eq;

    async fn mounted() -> Dashboard<ScriptedApi> {
        let api = ScriptedApi::default();
        api.push_ranking(0, Ok(menu(12)));
        let dashboard = Dashboard::with_config(api, FilterState::default(), DashboardConfig::default());
        dashboard.mount().await;
        dashboard.core().api().clear_calls();
        dashboard
    }

    fn ranking_calls(dashboard: &Dashboard<ScriptedApi>) -> Vec<u32> {
        dashboard
            .core()
            .api()
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Ranking(p) => Some(p.top_k),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_fetch() {
        let mut dashboard = mounted().await;
        for input in ["1", "12"] {
            dashboard.set_top_k(input);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(dashboard.view().filters().top_k(), 12);
        assert!(dashboard.has_pending_change());
        assert!(ranking_calls(&dashboard).is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(ranking_calls(&dashboard), vec![12]);
        assert!(!dashboard.has_pending_change());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_edit_schedules_nothing() {
        let mut dashboard = mounted().await;
        assert_eq!(dashboard.set_top_k("10"), FilterChange::Unchanged);
        assert!(!dashboard.has_pending_change());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_is_applied_after_debounce() {
        let mut dashboard = mounted().await;
        dashboard.set_query("espresso");
        assert_eq!(dashboard.view().visible_rows().len(), 12);

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(dashboard.view().visible_rows().len(), 4);
        assert!(dashboard.core().api().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_sync() {
        let mut dashboard = mounted().await;
        dashboard.set_normalize(false);
        let core = Arc::clone(&dashboard.core);
        drop(dashboard);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(core.api().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_syncs_immediately() {
        let mut dashboard = mounted().await;
        dashboard.set_top_k_value(3);
        dashboard.flush().await;
        assert_eq!(ranking_calls(&dashboard), vec![3]);
        assert!(!dashboard.has_pending_change());
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_uses_current_filters() {
        let mut dashboard = mounted().await;
        dashboard.set_top_k("25");
        dashboard.core().api().push_export(Ok(ExportDescriptor {
            saved: true,
            file: Some("exports/ranking.csv".into()),
            rows: Some(25),
            reason: None,
        }));

        let export = dashboard.export_csv().await.unwrap();

        assert_eq!(export.notice(), "CSV saved on server: exports/ranking.csv");
        let exported: Vec<u32> = dashboard
            .core()
            .api()
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Export(p) => Some(p.top_k),
                _ => None,
            })
            .collect();
        assert_eq!(exported, vec![25]);
    }
}
