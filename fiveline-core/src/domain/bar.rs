//! Bar: one trading day of OHLCV data, real or projected.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a bar came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarOrigin {
    /// Observed market data, passed through from the provider unmodified.
    Historical,
    /// Synthesized from a user target.
    Projected,
}

/// OHLCV bar for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub origin: BarOrigin,
}

impl Bar {
    /// Historical bar with the provider's prices as-is.
    pub fn historical(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            origin: BarOrigin::Historical,
        }
    }

    /// Projected bar moving from `open` to `close`.
    ///
    /// High and low are the envelope of the two prices and volume is zero:
    /// a what-if day has no intraday path and no traded size.
    pub fn projected(date: NaiveDate, open: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 0,
            origin: BarOrigin::Projected,
        }
    }

    pub fn is_projected(&self) -> bool {
        self.origin == BarOrigin::Projected
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}
