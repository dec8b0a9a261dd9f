//! TTL cache for fetched history, stored as Parquet.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{key}.parquet` with a
//! `{key}.meta.json` sidecar, where `key` is a BLAKE3 hash of the request.
//!
//! - Entries older than the TTL are misses (they stay on disk until
//!   overwritten or invalidated)
//! - Atomic writes (write to .tmp, rename into place)
//! - Corrupt entries are deleted and reported as misses
//! - Manual invalidation per symbol, or everything at once
//!
//! The projection pipeline never touches the cache; it sits in front of a
//! provider as [`CachedProvider`].

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use super::request::{validate_symbol, Adjustment, HistoryRequest};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time-to-live for a cached fetch: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Metadata sidecar for one cached request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub key: String,
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub adjustment: Adjustment,
    pub bar_count: usize,
    pub cached_at: DateTime<Utc>,
}

impl CacheMeta {
    /// Age of the entry at `now` (zero if the clock went backwards).
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < ttl
    }
}

/// The history cache.
#[derive(Debug, Clone)]
pub struct BarCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl BarCache {
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Deterministic key for a request.
    pub fn key(request: &HistoryRequest) -> String {
        let material = format!(
            "{}|{}|{}|{}",
            request.symbol, request.start, request.end, request.adjustment
        );
        blake3::hash(material.as_bytes()).to_hex().as_str()[..16].to_string()
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn data_path(&self, symbol: &str, key: &str) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{key}.parquet"))
    }

    fn meta_path(&self, symbol: &str, key: &str) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{key}.meta.json"))
    }

    /// Cached bars for `request`, or `None` if missing, stale or corrupt.
    pub fn get(&self, request: &HistoryRequest) -> Result<Option<Vec<RawBar>>, DataError> {
        self.get_at(request, Utc::now())
    }

    /// [`get`](Self::get) evaluated at an explicit time.
    pub fn get_at(
        &self,
        request: &HistoryRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<RawBar>>, DataError> {
        validate_symbol(&request.symbol)?;
        let key = Self::key(request);
        let meta_path = self.meta_path(&request.symbol, &key);

        let content = match fs::read_to_string(&meta_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DataError::CacheError(format!("meta read: {e}"))),
        };

        let meta: CacheMeta = match serde_json::from_str(&content) {
            Ok(meta) => meta,
            Err(e) => {
                self.discard(&request.symbol, &key, &format!("corrupt meta: {e}"));
                return Ok(None);
            }
        };

        if !meta.is_fresh(self.ttl, now) {
            tracing::debug!(
                symbol = %request.symbol,
                age_secs = meta.age(now).as_secs(),
                "cache entry expired"
            );
            return Ok(None);
        }

        match load_and_validate_parquet(&self.data_path(&request.symbol, &key), meta.bar_count) {
            Ok(bars) => Ok(Some(bars)),
            Err(e) => {
                self.discard(&request.symbol, &key, &e.to_string());
                Ok(None)
            }
        }
    }

    fn discard(&self, symbol: &str, key: &str, reason: &str) {
        tracing::warn!(symbol, key, reason, "discarding corrupt cache entry");
        let _ = fs::remove_file(self.data_path(symbol, key));
        let _ = fs::remove_file(self.meta_path(symbol, key));
    }

    /// Store bars for `request`, replacing any previous entry.
    pub fn put(&self, request: &HistoryRequest, bars: &[RawBar]) -> Result<(), DataError> {
        validate_symbol(&request.symbol)?;
        if bars.is_empty() {
            return Err(DataError::CacheError("no bars to cache".into()));
        }

        let key = Self::key(request);
        fs::create_dir_all(self.symbol_dir(&request.symbol))
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let df = bars_to_dataframe(bars)?;
        let path = self.data_path(&request.symbol, &key);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            key: key.clone(),
            symbol: request.symbol.clone(),
            start: request.start,
            end: request.end,
            adjustment: request.adjustment,
            bar_count: bars.len(),
            cached_at: Utc::now(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(&request.symbol, &key), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Drop every entry for `symbol`. Returns the number of entries removed.
    pub fn invalidate(&self, symbol: &str) -> Result<usize, DataError> {
        let symbol = symbol.trim();
        validate_symbol(symbol)?;
        let dir = self.symbol_dir(symbol);
        if !dir.exists() {
            return Ok(0);
        }
        let removed = count_entries(&dir);
        fs::remove_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("remove {}: {e}", dir.display())))?;
        tracing::info!(symbol, removed, "cache invalidated");
        Ok(removed)
    }

    /// Drop every entry. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, DataError> {
        let mut removed = 0;
        for dir in self.symbol_dirs()? {
            removed += count_entries(&dir);
            fs::remove_dir_all(&dir)
                .map_err(|e| DataError::CacheError(format!("remove {}: {e}", dir.display())))?;
        }
        tracing::info!(removed, "cache cleared");
        Ok(removed)
    }

    /// Metadata of every readable entry, sorted by symbol then start date.
    pub fn entries(&self) -> Result<Vec<CacheMeta>, DataError> {
        let mut metas = Vec::new();
        for dir in self.symbol_dirs()? {
            let listing = fs::read_dir(&dir)
                .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
            for entry in listing.flatten() {
                let path = entry.path();
                if !is_meta_file(&path) {
                    continue;
                }
                if let Some(meta) = fs::read_to_string(&path)
                    .ok()
                    .and_then(|c| serde_json::from_str::<CacheMeta>(&c).ok())
                {
                    metas.push(meta);
                }
            }
        }
        metas.sort_by(|a, b| (&a.symbol, a.start).cmp(&(&b.symbol, b.start)));
        Ok(metas)
    }

    fn symbol_dirs(&self) -> Result<Vec<PathBuf>, DataError> {
        let listing = match fs::read_dir(&self.cache_dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::CacheError(format!("read dir: {e}"))),
        };
        Ok(listing
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("symbol="))
            })
            .collect())
    }
}

fn is_meta_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".meta.json"))
}

fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|listing| listing.flatten().filter(|e| is_meta_file(&e.path())).count())
        .unwrap_or(0)
}

/// A provider with a TTL cache in front of it.
///
/// Fresh entries are served as [`DataSource::Cache`]; misses go to the inner
/// provider and non-empty results are stored. A failed store is logged and
/// the fetched bars are still returned.
pub struct CachedProvider<P> {
    inner: P,
    cache: BarCache,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: BarCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, request: &HistoryRequest) -> Result<FetchResult, DataError> {
        if let Some(bars) = self.cache.get(request)? {
            tracing::info!(symbol = %request.symbol, bars = bars.len(), "cache hit");
            return Ok(FetchResult {
                symbol: request.symbol.clone(),
                bars,
                source: DataSource::Cache,
            });
        }

        tracing::info!(symbol = %request.symbol, provider = self.inner.name(), "cache miss");
        let result = self.inner.fetch(request)?;
        if !result.bars.is_empty() {
            if let Err(e) = self.cache.put(request, &result.bars) {
                tracing::warn!(symbol = %request.symbol, error = %e, "failed to cache history");
            }
        }
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[RawBar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("adj_close".into(), adj_closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and check it holds `expected_rows` bars.
fn load_and_validate_parquet(path: &Path, expected_rows: usize) -> Result<Vec<RawBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() != expected_rows {
        return Err(DataError::CacheError(format!(
            "row count {} does not match metadata {expected_rows}",
            df.height()
        )));
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<RawBar>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("missing column '{name}': {e}")))
    };
    let float = |name: &str| -> Result<Vec<f64>, DataError> {
        Ok(col(name)?
            .f64()
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    };

    let dates = col("date")?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let volumes = col("volume")?
        .u64()
        .map_err(|e| DataError::ParquetError(format!("volume column type: {e}")))?;
    let opens = float("open")?;
    let highs = float("high")?;
    let lows = float("low")?;
    let closes = float("close")?;
    let adj_closes = float("adj_close")?;

    (0..df.height())
        .map(|i| {
            let days = dates
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(RawBar {
                date: epoch() + chrono::Duration::days(days as i64),
                open: opens[i],
                high: highs[i],
                low: lows[i],
                close: closes[i],
                volume: volumes.get(i).unwrap_or(0),
                adj_close: adj_closes[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(symbol: &str) -> HistoryRequest {
        HistoryRequest::new(
            symbol,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Adjustment::Forward,
        )
        .unwrap()
    }

    fn sample_bars() -> Vec<RawBar> {
        vec![
            RawBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                volume: 1000,
                adj_close: 100.5,
            },
            RawBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                open: 101.0,
                high: 103.0,
                low: 100.0,
                close: 102.0,
                volume: 1100,
                adj_close: 102.0,
            },
        ]
    }

    #[test]
    fn put_then_get_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), DEFAULT_TTL);

        cache.put(&request("SPY"), &sample_bars()).unwrap();
        let loaded = cache.get(&request("SPY")).unwrap().unwrap();

        assert_eq!(loaded, sample_bars());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), Duration::from_secs(60));
        cache.put(&request("SPY"), &sample_bars()).unwrap();

        let later = Utc::now() + chrono::Duration::seconds(61);
        assert!(cache.get_at(&request("SPY"), later).unwrap().is_none());
        assert!(cache.get(&request("SPY")).unwrap().is_some());
    }

    #[test]
    fn key_depends_on_every_request_field() {
        let base = request("SPY");
        let mut other = base.clone();
        other.adjustment = Adjustment::None;
        assert_ne!(BarCache::key(&base), BarCache::key(&other));
        assert_eq!(BarCache::key(&base), BarCache::key(&request("SPY")));
        assert_eq!(BarCache::key(&base).len(), 16);
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), DEFAULT_TTL);
        assert!(cache.get(&request("QQQ")).unwrap().is_none());
    }

    #[test]
    fn empty_put_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), DEFAULT_TTL);
        assert!(cache.put(&request("SPY"), &[]).is_err());
    }

    #[test]
    fn corrupt_data_file_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), DEFAULT_TTL);
        let req = request("SPY");
        cache.put(&req, &sample_bars()).unwrap();

        let key = BarCache::key(&req);
        fs::write(cache.data_path("SPY", &key), b"not parquet").unwrap();

        assert!(cache.get(&req).unwrap().is_none());
        assert!(!cache.meta_path("SPY", &key).exists());
    }

    #[test]
    fn invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path(), DEFAULT_TTL);
        cache.put(&request("SPY"), &sample_bars()).unwrap();
        cache.put(&request("QQQ"), &sample_bars()).unwrap();
        assert_eq!(cache.entries().unwrap().len(), 2);

        assert_eq!(cache.invalidate("SPY").unwrap(), 1);
        assert!(cache.get(&request("SPY")).unwrap().is_none());
        assert_eq!(cache.invalidate("SPY").unwrap(), 0);

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.entries().unwrap().is_empty());
    }

    #[test]
    fn invalidate_refuses_paths_outside_cache() {
        let root = tempfile::tempdir().unwrap();
        let outside = root.path().join("precious");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("keep.txt"), b"keep").unwrap();

        let cache = BarCache::new(root.path().join("cache"), DEFAULT_TTL);
        cache.put(&request("SPY"), &sample_bars()).unwrap();

        for symbol in ["SPY/../../precious", "../precious", "..", "a\\b"] {
            assert!(
                matches!(cache.invalidate(symbol), Err(DataError::InvalidRequest(_))),
                "{symbol}"
            );
        }
        assert!(outside.join("keep.txt").exists());
        assert!(cache.get(&request("SPY")).unwrap().is_some());
    }

    #[test]
    fn put_and_get_refuse_unvalidated_symbols() {
        let root = tempfile::tempdir().unwrap();
        let cache = BarCache::new(root.path().join("cache"), DEFAULT_TTL);
        let mut req = request("SPY");
        req.symbol = "X/../../escape".into();

        assert!(matches!(
            cache.put(&req, &sample_bars()),
            Err(DataError::InvalidRequest(_))
        ));
        assert!(matches!(cache.get(&req), Err(DataError::InvalidRequest(_))));
        assert!(!root.path().join("escape").exists());
    }

    #[test]
    fn entries_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path().join("nope"), DEFAULT_TTL);
        assert!(cache.entries().unwrap().is_empty());
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
