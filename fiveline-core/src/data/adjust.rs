//! Turn raw provider bars into historical bars, applying price adjustment.
//!
//! Providers report both the traded close and a dividend/split adjusted close
//! that is anchored to the latest bar. The ratio `adj_close / close` is the
//! per-bar adjustment factor.

use super::provider::RawBar;
use super::request::Adjustment;
use crate::domain::Bar;

/// Per-bar factor, or `None` when the bar can't supply one.
fn factor(bar: &RawBar) -> Option<f64> {
    let f = bar.adj_close / bar.close;
    (bar.close > 0.0 && bar.adj_close > 0.0 && f.is_finite()).then_some(f)
}

fn scaled(bar: &RawBar, f: f64) -> Bar {
    Bar::historical(
        bar.date,
        bar.open * f,
        bar.high * f,
        bar.low * f,
        bar.close * f,
        bar.volume,
    )
}

/// Convert raw bars to historical bars under `adjustment`.
///
/// Bars without a usable factor pass through unscaled. For backward
/// adjustment the anchor is the first bar that has a factor.
pub fn to_historical_bars(raw: &[RawBar], adjustment: Adjustment) -> Vec<Bar> {
    let bars: Vec<Bar> = match adjustment {
        Adjustment::None => raw.iter().map(|b| scaled(b, 1.0)).collect(),
        Adjustment::Forward => raw
            .iter()
            .map(|b| scaled(b, factor(b).unwrap_or(1.0)))
            .collect(),
        Adjustment::Backward => {
            let anchor = raw.iter().find_map(factor).unwrap_or(1.0);
            raw.iter()
                .map(|b| scaled(b, factor(b).map_or(1.0, |f| f / anchor)))
                .collect()
        }
    };

    // Suspect bars still pass through; averages over them come out undefined
    // or as reported.
    let suspect = bars.iter().filter(|b| !b.is_sane()).count();
    if suspect > 0 {
        tracing::warn!(
            suspect,
            total = bars.len(),
            "history contains bars failing OHLC sanity checks"
        );
    }
    bars
}
