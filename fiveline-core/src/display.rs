//! Display window: the trailing slice of the series a chart shows.

use crate::domain::Bar;
use crate::moving_average::MovingAverageSet;
use crate::series::Series;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Look-back lengths offered for display, in trading bars.
pub const LOOKBACK_CHOICES: [usize; 4] = [120, 250, 500, 1000];

/// Look-back used when none is given.
pub const DEFAULT_LOOKBACK: usize = 250;

/// A series slice and its aligned moving averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayResult {
    pub series: Series,
    pub averages: MovingAverageSet,
}

/// One line of the projected-days summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRow {
    pub date: NaiveDate,
    pub close: f64,
    pub averages: BTreeMap<usize, Option<f64>>,
}

impl DisplayResult {
    pub fn bars(&self) -> &[Bar] {
        self.series.bars()
    }

    pub fn averages(&self) -> &MovingAverageSet {
        &self.averages
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Close and every moving average for each projected bar in the slice.
    pub fn projected_rows(&self) -> Vec<ProjectedRow> {
        let offset = self.series.historical_len();
        self.series
            .projected()
            .iter()
            .enumerate()
            .map(|(i, bar)| ProjectedRow {
                date: bar.date,
                close: bar.close,
                averages: self.averages.row(offset + i),
            })
            .collect()
    }
}

/// Keep the trailing `lookback + projected_count` bars and their averages.
///
/// A series shorter than that is returned whole, without padding.
pub fn select(
    series: &Series,
    averages: &MovingAverageSet,
    lookback: usize,
    projected_count: usize,
) -> DisplayResult {
    let keep = lookback.saturating_add(projected_count);
    DisplayResult {
        series: series.tail(keep),
        averages: averages.tail(keep),
    }
}
