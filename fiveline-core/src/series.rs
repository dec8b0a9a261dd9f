//! Merged series: one run of historical bars followed by projected bars.

use crate::domain::{Bar, BarOrigin};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bar dates not strictly increasing at index {index}: {previous} then {date}")]
    OutOfOrder {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("bar at index {index} ({date}) has origin {found:?}, expected {expected:?}")]
    WrongOrigin {
        index: usize,
        date: NaiveDate,
        expected: BarOrigin,
        found: BarOrigin,
    },
}

/// Chronological bar series with a historical prefix and a projected tail.
///
/// Only constructed through [`merge`] or by slicing an existing series, so the
/// ordering and origin split always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    bars: Vec<Bar>,
    historical_len: usize,
}

impl Series {
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of leading historical bars.
    pub fn historical_len(&self) -> usize {
        self.historical_len
    }

    pub fn historical(&self) -> &[Bar] {
        &self.bars[..self.historical_len]
    }

    /// The projected tail.
    pub fn projected(&self) -> &[Bar] {
        &self.bars[self.historical_len..]
    }

    pub fn last_historical(&self) -> Option<&Bar> {
        self.historical().last()
    }

    /// The trailing `n` bars, or the whole series when shorter.
    pub fn tail(&self, n: usize) -> Series {
        let start = self.bars.len().saturating_sub(n);
        Series {
            bars: self.bars[start..].to_vec(),
            historical_len: self.historical_len.saturating_sub(start),
        }
    }
}

/// Check that `bars` have strictly increasing dates and all carry `origin`.
///
/// `offset` shifts reported indices, so errors point into the merged series.
pub(crate) fn check_run(
    bars: &[Bar],
    origin: BarOrigin,
    offset: usize,
) -> Result<(), SeriesError> {
    for (i, bar) in bars.iter().enumerate() {
        if bar.origin != origin {
            return Err(SeriesError::WrongOrigin {
                index: offset + i,
                date: bar.date,
                expected: origin,
                found: bar.origin,
            });
        }
        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(SeriesError::OutOfOrder {
                index: offset + i,
                previous: bars[i - 1].date,
                date: bar.date,
            });
        }
    }
    Ok(())
}

/// Concatenate historical and projected bars into one series.
///
/// Never re-sorts: the inputs must already be ordered, tagged with the right
/// origin, and every projected date must follow the last historical date.
pub fn merge(historical: &[Bar], projected: &[Bar]) -> Result<Series, SeriesError> {
    check_run(historical, BarOrigin::Historical, 0)?;
    check_run(projected, BarOrigin::Projected, historical.len())?;

    if let (Some(last), Some(first)) = (historical.last(), projected.first()) {
        if first.date <= last.date {
            return Err(SeriesError::OutOfOrder {
                index: historical.len(),
                previous: last.date,
                date: first.date,
            });
        }
    }

    let mut bars = Vec::with_capacity(historical.len() + projected.len());
    bars.extend_from_slice(historical);
    bars.extend_from_slice(projected);

    Ok(Series {
        bars,
        historical_len: historical.len(),
    })
}
