//! Dashboard orchestration: filter edits in, fenced fetches out.

mod dashboard;
mod fence;
mod orchestrator;
mod view;

#[cfg(test)]
mod testing;

pub use dashboard::{Dashboard, DashboardConfig};
pub use fence::{Fences, RequestFence, Ticket};
pub use orchestrator::{QueryOrchestrator, SelectionError, SyncPlan};
pub use view::{LoadingFlags, TableView, ViewModel};

pub use menurank_filters::{FilterChange, FilterError, FilterState};
