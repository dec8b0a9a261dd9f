//! Multi-window moving averages over a merged series.
//!
//! Averages run over the whole series, history and projection together, so
//! short windows react to the what-if days while long windows stay dominated
//! by real closes.

use crate::indicators::{Indicator, Sma};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The five standard windows: MA5, MA10, MA20, MA60, MA120.
pub const MA_WINDOWS: [usize; 5] = [5, 10, 20, 60, 120];

#[derive(Debug, Error, PartialEq)]
pub enum MovingAverageError {
    #[error("moving average window must be positive")]
    ZeroWindow,
}

/// Per-window average values, aligned index-for-index with a series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MovingAverageSet {
    values: BTreeMap<usize, Vec<Option<f64>>>,
    len: usize,
}

impl MovingAverageSet {
    /// Window sizes present, ascending.
    pub fn windows(&self) -> Vec<usize> {
        self.values.keys().copied().collect()
    }

    /// The full aligned sequence for one window.
    pub fn get(&self, window: usize) -> Option<&[Option<f64>]> {
        self.values.get(&window).map(|v| v.as_slice())
    }

    /// The average for `window` at `index`; `None` when undefined or absent.
    pub fn value(&self, window: usize, index: usize) -> Option<f64> {
        self.values
            .get(&window)
            .and_then(|v| v.get(index).copied().flatten())
    }

    /// All windows at one index, in ascending window order.
    pub fn row(&self, index: usize) -> BTreeMap<usize, Option<f64>> {
        self.values
            .iter()
            .map(|(w, v)| (*w, v.get(index).copied().flatten()))
            .collect()
    }

    /// Length of the series the averages are aligned with.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The trailing `n` points of every window, or everything when shorter.
    pub fn tail(&self, n: usize) -> MovingAverageSet {
        let start = self.len.saturating_sub(n);
        MovingAverageSet {
            values: self
                .values
                .iter()
                .map(|(w, v)| (*w, v[start..].to_vec()))
                .collect(),
            len: self.len - start,
        }
    }
}

/// Compute a simple moving average of closes for every window in `windows`.
///
/// Duplicate windows collapse into one entry.
pub fn compute(series: &Series, windows: &[usize]) -> Result<MovingAverageSet, MovingAverageError> {
    let mut values = BTreeMap::new();
    for &window in windows {
        let sma = Sma::new(window).ok_or(MovingAverageError::ZeroWindow)?;
        if series.len() <= sma.lookback() {
            tracing::debug!(
                indicator = sma.name(),
                bars = series.len(),
                needed = sma.lookback() + 1,
                "series too short, average undefined throughout"
            );
        }
        values
            .entry(window)
            .or_insert_with(|| sma.compute(series.bars()));
    }

    Ok(MovingAverageSet {
        values,
        len: series.len(),
    })
}
