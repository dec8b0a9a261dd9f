//! Indicators over bar series.
//!
//! Indicators are pure functions: bar history in, one optional value per bar
//! out. `None` marks a point the indicator cannot define yet (warmup) or at
//! all (a void bar inside the window). Values are never fabricated.

pub mod sma;

pub use sma::Sma;

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Projected bars appended
/// after the history therefore never change the historical part of the output.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ma5").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces a value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec` of the same length as `bars`; the first `lookback()`
    /// entries are `None`.
    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>>;
}

/// Create historical bars on consecutive trading days from close prices.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let dates = crate::calendar::trading_days_after(base_date, closes.len());
    closes
        .iter()
        .zip(dates)
        .enumerate()
        .map(|(i, (&close, date))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::historical(
                date,
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
