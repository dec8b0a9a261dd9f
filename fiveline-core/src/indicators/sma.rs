//! Simple Moving Average (SMA).
//!
//! Rolling arithmetic mean of close prices over a fixed window, computed as a
//! sliding-window scan. First defined value at index period-1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Returns `None` for a zero period.
    pub fn new(period: usize) -> Option<Self> {
        if period == 0 {
            return None;
        }
        Some(Self {
            period,
            name: format!("ma{period}"),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let mut result = vec![None; bars.len()];

        // Each window is summed on its own, so an extreme close cannot leave
        // rounding residue in later means. A window holding any non-finite
        // close stays undefined.
        for (start, window) in bars.windows(self.period).enumerate() {
            if window.iter().all(|b| b.close.is_finite()) {
                let sum: f64 = window.iter().map(|b| b.close).sum();
                result[start + self.period - 1] = Some(sum / self.period as f64);
            }
        }

        result
    }
}
