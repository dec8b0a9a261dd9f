//! What-if projection: turn per-day targets into synthetic bars.
//!
//! Each projected day opens at the previous day's close (the last real close
//! for the first day) and closes at the target. Days chain: a percent move on
//! day 3 applies to day 2's projected close, not to the reference price.

use crate::calendar;
use crate::domain::{Bar, PredictionTarget};
use chrono::NaiveDate;

/// Build one projected bar per target, starting after `reference_date`.
///
/// The output length always equals `targets.len()`; bounding the number of
/// targets is the caller's concern.
pub fn project(
    targets: &[PredictionTarget],
    reference_price: f64,
    reference_date: NaiveDate,
) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(targets.len());
    let mut current_price = reference_price;
    let mut current_date = reference_date;

    for (day, target) in targets.iter().enumerate() {
        current_date = calendar::advance(current_date);

        if target.is_degenerate() {
            // Kept for compatibility: a non-positive price means "no change".
            tracing::warn!(
                day = day + 1,
                %target,
                "non-positive target price ignored, close carried forward"
            );
        }
        let target_price = target.resolve(current_price);

        bars.push(Bar::projected(current_date, current_price, target_price));
        current_price = target_price;
    }

    bars
}
