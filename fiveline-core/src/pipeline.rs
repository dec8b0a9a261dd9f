//! Pipeline entry point: history + targets + look-back → display result.
//!
//! A pure function of its three inputs. No caching, no I/O; fetching the
//! history is the caller's job.

use crate::display::{self, DisplayResult};
use crate::domain::{Bar, BarOrigin, PredictionTarget, MAX_TARGETS};
use crate::moving_average::{self, MovingAverageError, MA_WINDOWS};
use crate::projection;
use crate::series::{self, SeriesError};
use thiserror::Error;

/// Structurally invalid input. Distinct from having no data.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("expected 1 to 5 targets, got {0}")]
    TargetCount(usize),

    #[error("look-back must be positive")]
    ZeroLookback,

    #[error("invalid historical series: {0}")]
    History(#[from] SeriesError),

    #[error(transparent)]
    MovingAverage(#[from] MovingAverageError),
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The history was empty; nothing was projected or averaged.
    NoData,
    Ready(DisplayResult),
}

impl PipelineOutcome {
    pub fn into_result(self) -> Option<DisplayResult> {
        match self {
            PipelineOutcome::NoData => None,
            PipelineOutcome::Ready(result) => Some(result),
        }
    }
}

/// Project `targets` past the end of `historical`, average with the standard
/// windows and keep the last `lookback` real bars plus the projection.
pub fn run(
    historical: &[Bar],
    targets: &[PredictionTarget],
    lookback: usize,
) -> Result<PipelineOutcome, PipelineError> {
    run_with_windows(historical, targets, lookback, &MA_WINDOWS)
}

/// [`run`] with an explicit set of moving-average windows.
pub fn run_with_windows(
    historical: &[Bar],
    targets: &[PredictionTarget],
    lookback: usize,
    windows: &[usize],
) -> Result<PipelineOutcome, PipelineError> {
    if targets.is_empty() || targets.len() > MAX_TARGETS {
        return Err(PipelineError::TargetCount(targets.len()));
    }
    if lookback == 0 {
        return Err(PipelineError::ZeroLookback);
    }

    let Some(reference) = historical.last() else {
        tracing::debug!("empty history, skipping projection");
        return Ok(PipelineOutcome::NoData);
    };

    // Validate before projecting so a bad history is reported as such rather
    // than as a merge failure at the seam.
    series::check_run(historical, BarOrigin::Historical, 0)?;

    let projected = projection::project(targets, reference.close, reference.date);
    let merged = series::merge(historical, &projected)?;
    let averages = moving_average::compute(&merged, windows)?;
    let shown = display::select(&merged, &averages, lookback, targets.len());

    tracing::debug!(
        historical = historical.len(),
        projected = projected.len(),
        shown = shown.len(),
        "pipeline run complete"
    );

    Ok(PipelineOutcome::Ready(shown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn empty_history_is_no_data() {
        let out = run(&[], &[PredictionTarget::PercentChange(1.0)], 250).unwrap();
        assert_eq!(out, PipelineOutcome::NoData);
        assert!(out.into_result().is_none());
    }

    #[test]
    fn target_count_validated_before_data() {
        assert_eq!(run(&[], &[], 250), Err(PipelineError::TargetCount(0)));
        let six = [PredictionTarget::PercentChange(1.0); 6];
        assert_eq!(
            run(&make_bars(&[1.0]), &six, 250),
            Err(PipelineError::TargetCount(6))
        );
    }

    #[test]
    fn zero_lookback_rejected() {
        let bars = make_bars(&[1.0, 2.0]);
        assert_eq!(
            run(&bars, &[PredictionTarget::PercentChange(1.0)], 0),
            Err(PipelineError::ZeroLookback)
        );
    }

    #[test]
    fn unordered_history_rejected() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars.swap(1, 2);
        let err = run(&bars, &[PredictionTarget::PercentChange(1.0)], 10).unwrap_err();
        assert!(matches!(err, PipelineError::History(SeriesError::OutOfOrder { .. })));
    }

    #[test]
    fn projected_bar_in_history_rejected() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].origin = BarOrigin::Projected;
        let err = run(&bars, &[PredictionTarget::PercentChange(1.0)], 10).unwrap_err();
        assert!(matches!(err, PipelineError::History(SeriesError::WrongOrigin { .. })));
    }

    #[test]
    fn ready_result_has_lookback_plus_targets() {
        let closes: Vec<f64> = (0..300).map(|i| 50.0 + (i % 7) as f64).collect();
        let bars = make_bars(&closes);
        let targets = [PredictionTarget::PercentChange(2.0); 5];
        let shown = run(&bars, &targets, 120).unwrap().into_result().unwrap();

        assert_eq!(shown.len(), 125);
        assert_eq!(shown.series.projected().len(), 5);
        assert_eq!(shown.averages().windows(), MA_WINDOWS.to_vec());
        // 300 bars of history: MA120 is defined across the whole slice.
        assert!(shown.averages().get(120).unwrap().iter().all(|v| v.is_some()));
    }

    #[test]
    fn custom_windows() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let shown = run_with_windows(&bars, &[PredictionTarget::AbsolutePrice(4.0)], 10, &[2])
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(shown.averages().windows(), vec![2]);
        assert_eq!(shown.averages().value(2, 3), Some(3.5));
    }
}
