//! Scripted in-memory `RankingApi` for orchestration tests.

use chrono::NaiveDate;
use menurank_backend_http::{BackendError, RankingApi};
use menurank_model::{
    DayRankingParams, ExportDescriptor, ExportParams, RankingParams, RankingRow, SeriesParams,
    SeriesPoint, ShareParams, ShareSlice,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Ranking(RankingParams),
    Share(ShareParams),
    Series(SeriesParams),
    Export(ExportParams),
}

struct Reply<T> {
    delay: Duration,
    result: Result<T, BackendError>,
}

type Queue<T> = Mutex<VecDeque<Reply<T>>>;

/// Replies are consumed in request order; an empty queue answers `Ok` empty.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    ranking: Queue<Vec<RankingRow>>,
    share: Queue<Vec<ShareSlice>>,
    series: Queue<Vec<SeriesPoint>>,
    export: Queue<ExportDescriptor>,
    calls: Mutex<Vec<Call>>,
}

fn push<T>(queue: &Queue<T>, delay_ms: u64, result: Result<T, BackendError>) {
    queue.lock().unwrap().push_back(Reply {
        delay: Duration::from_millis(delay_ms),
        result,
    });
}

async fn next<T: Default>(queue: &Queue<T>) -> Result<T, BackendError> {
    let reply = queue.lock().unwrap().pop_front();
    match reply {
        Some(reply) => {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result
        }
        None => Ok(T::default()),
    }
}

impl ScriptedApi {
    pub(crate) fn push_ranking(&self, delay_ms: u64, result: Result<Vec<RankingRow>, BackendError>) {
        push(&self.ranking, delay_ms, result);
    }

    pub(crate) fn push_share(&self, delay_ms: u64, result: Result<Vec<ShareSlice>, BackendError>) {
        push(&self.share, delay_ms, result);
    }

    pub(crate) fn push_series(&self, delay_ms: u64, result: Result<Vec<SeriesPoint>, BackendError>) {
        push(&self.series, delay_ms, result);
    }

    pub(crate) fn push_export(&self, result: Result<ExportDescriptor, BackendError>) {
        push(&self.export, 0, result);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RankingApi for ScriptedApi {
    async fn ranking(&self, params: &RankingParams) -> Result<Vec<RankingRow>, BackendError> {
        self.record(Call::Ranking(*params));
        next(&self.ranking).await
    }

    async fn ranking_by_day(&self, _: &DayRankingParams) -> Result<Vec<RankingRow>, BackendError> {
        Ok(Vec::new())
    }

    async fn series(&self, params: &SeriesParams) -> Result<Vec<SeriesPoint>, BackendError> {
        self.record(Call::Series(*params));
        next(&self.series).await
    }

    async fn share(&self, params: &ShareParams) -> Result<Vec<ShareSlice>, BackendError> {
        self.record(Call::Share(*params));
        next(&self.share).await
    }

    async fn export_csv(&self, params: &ExportParams) -> Result<ExportDescriptor, BackendError> {
        self.record(Call::Export(*params));
        next(&self.export).await
    }

    async fn report(&self, _: &ExportParams) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::Unavailable)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub(crate) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
}

/// `n` rows, product ids 100.., ranks 1..
pub(crate) fn menu(n: usize) -> Vec<RankingRow> {
    const NAMES: [&str; 12] = [
        "Espresso", "Latte", "Double Espresso", "Mocha", "Americano", "ESPRESSO Tonic",
        "Cortado", "Flat White", "Cappuccino", "Iced Espresso", "Chai", "Macchiato",
    ];
    (0..n)
        .map(|i| {
            RankingRow::new(
                100 + i as i64,
                i as u32 + 1,
                NAMES[i % NAMES.len()],
                1.0 - i as f64 * 0.05,
            )
        })
        .collect()
}

pub(crate) fn points(scores: &[f64]) -> Vec<SeriesPoint> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| SeriesPoint::new(date(10 + i as u32), score))
        .collect()
}
