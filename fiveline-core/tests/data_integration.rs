//! Integration tests for history retrieval: CSV import, the TTL cache in front
//! of a provider, and the hand-off into the projection pipeline.

use chrono::NaiveDate;
use fiveline_core::data::{
    to_historical_bars, Adjustment, BarCache, CachedProvider, CsvProvider, DataError,
    DataProvider, DataSource, FetchResult, HistoryRequest, DEFAULT_TTL,
};
use fiveline_core::{run, PipelineOutcome, PredictionTarget};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Thirty weekdays of January/February 2024 with a gentle uptrend and a 2:1
/// adjustment factor on the first ten days.
fn write_history_csv(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("history.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "date,open,high,low,close,volume,adj_close").unwrap();
    let dates = fiveline_core::calendar::trading_days_after(d(2023, 12, 29), 30);
    for (i, date) in dates.iter().enumerate() {
        let close = 20.0 + i as f64 * 0.5;
        let adj = if i < 10 { close / 2.0 } else { close };
        writeln!(
            file,
            "{date},{:.2},{:.2},{:.2},{close:.2},{}, {adj:.4}",
            close - 0.2,
            close + 0.3,
            close - 0.4,
            10_000 + i
        )
        .unwrap();
    }
    path
}

/// Counts fetches that reach the wrapped provider.
struct CountingProvider<P> {
    inner: P,
    calls: Arc<AtomicUsize>,
}

impl<P: DataProvider> DataProvider for CountingProvider<P> {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(request)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

fn request(adjustment: Adjustment) -> HistoryRequest {
    HistoryRequest::new("000001", d(2024, 1, 1), d(2024, 2, 29), adjustment).unwrap()
}

#[test]
fn csv_provider_filters_to_request_range() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(write_history_csv(dir.path()));
    assert!(provider.is_available());

    let narrow = HistoryRequest::new("000001", d(2024, 1, 8), d(2024, 1, 12), Adjustment::None)
        .unwrap();
    let fetched = provider.fetch(&narrow).unwrap();
    assert_eq!(fetched.source, DataSource::CsvImport);
    assert_eq!(fetched.bars.len(), 5);
    assert_eq!(fetched.bars[0].date, d(2024, 1, 8));
    assert_eq!(fetched.bars[4].date, d(2024, 1, 12));
}

#[test]
fn missing_csv_is_unavailable_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(dir.path().join("absent.csv"));
    assert!(!provider.is_available());
    assert!(matches!(
        provider.fetch(&request(Adjustment::None)),
        Err(DataError::Csv(_))
    ));
}

#[test]
fn cached_provider_hits_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = CountingProvider {
        inner: CsvProvider::new(write_history_csv(dir.path())),
        calls: Arc::clone(&calls),
    };
    let cache = BarCache::new(dir.path().join("cache"), DEFAULT_TTL);
    let provider = CachedProvider::new(inner, cache);
    let req = request(Adjustment::Forward);

    let first = provider.fetch(&req).unwrap();
    assert_eq!(first.source, DataSource::CsvImport);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = provider.fetch(&req).unwrap();
    assert_eq!(second.source, DataSource::Cache);
    assert_eq!(second.bars, first.bars);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different adjustment is a different entry.
    provider.fetch(&request(Adjustment::Backward)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.cache().entries().unwrap().len(), 2);

    assert_eq!(provider.cache().invalidate("000001").unwrap(), 2);
    let third = provider.fetch(&req).unwrap();
    assert_eq!(third.source, DataSource::CsvImport);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn zero_ttl_always_refetches() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = CountingProvider {
        inner: CsvProvider::new(write_history_csv(dir.path())),
        calls: Arc::clone(&calls),
    };
    let provider = CachedProvider::new(inner, BarCache::new(dir.path().join("c"), Duration::ZERO));
    let req = request(Adjustment::None);

    provider.fetch(&req).unwrap();
    provider.fetch(&req).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn empty_range_is_not_cached_and_yields_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let cache = BarCache::new(dir.path().join("cache"), DEFAULT_TTL);
    let provider = CachedProvider::new(CsvProvider::new(write_history_csv(dir.path())), cache);

    let req = HistoryRequest::new("000001", d(2025, 6, 1), d(2025, 6, 30), Adjustment::Forward)
        .unwrap();
    let fetched = provider.fetch(&req).unwrap();
    assert!(fetched.bars.is_empty());
    assert!(provider.cache().entries().unwrap().is_empty());

    let bars = to_historical_bars(&fetched.bars, req.adjustment);
    let out = run(&bars, &[PredictionTarget::PercentChange(5.0)], 250).unwrap();
    assert_eq!(out, PipelineOutcome::NoData);
}

#[test]
fn csv_history_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(write_history_csv(dir.path()));
    let req = request(Adjustment::Forward);
    let fetched = provider.fetch(&req).unwrap();

    let forward = to_historical_bars(&fetched.bars, Adjustment::Forward);
    let raw = to_historical_bars(&fetched.bars, Adjustment::None);
    // Forward adjustment halves the early closes and leaves the latest alone.
    assert!((forward[0].close - raw[0].close / 2.0).abs() < 1e-9);
    assert_eq!(forward.last().unwrap().close, raw.last().unwrap().close);

    let targets = [
        PredictionTarget::PercentChange(2.0),
        PredictionTarget::PercentChange(-1.0),
        PredictionTarget::AbsolutePrice(40.0),
    ];
    let result = run(&forward, &targets, 20).unwrap().into_result().unwrap();
    assert_eq!(result.len(), 23);

    let rows = result.projected_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].close, 40.0);
    // Thirty real bars plus three projected: MA20 is defined, MA60 is not.
    assert!(rows.iter().all(|r| r.averages[&20].is_some()));
    assert!(rows.iter().all(|r| r.averages[&60].is_none()));
}
