//! Per-kind request sequencing.
//!
//! Every request of a kind takes a ticket; only the holder of the newest
//! ticket may write its response. There is no network cancellation, stale
//! responses simply arrive and get dropped.

use menurank_model::QueryKind;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestFence {
    latest: AtomicU64,
}

impl RequestFence {
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Retire every outstanding ticket without starting a request.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct Fences {
    ranking: RequestFence,
    share: RequestFence,
    series: RequestFence,
}

impl Fences {
    pub fn get(&self, kind: QueryKind) -> &RequestFence {
        match kind {
            QueryKind::Ranking => &self.ranking,
            QueryKind::Share => &self.share,
            QueryKind::Series => &self.series,
        }
    }
}
