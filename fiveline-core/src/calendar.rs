//! Trading calendar: weekdays only.
//!
//! No exchange holidays are modeled. A projected bar may land on a day the
//! market is actually closed; that is accepted for a what-if chart.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The first trading day strictly after `date`.
pub fn advance(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_trading_day(next) {
        next += Duration::days(1);
    }
    next
}

/// The `n` trading days following `date`, in order.
pub fn trading_days_after(date: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut current = date;
    for _ in 0..n {
        current = advance(current);
        days.push(current);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn friday_advances_to_monday() {
        assert_eq!(advance(d(2024, 1, 5)), d(2024, 1, 8));
    }

    #[test]
    fn weekend_days_advance_to_monday() {
        assert_eq!(advance(d(2024, 1, 6)), d(2024, 1, 8));
        assert_eq!(advance(d(2024, 1, 7)), d(2024, 1, 8));
    }

    #[test]
    fn midweek_advances_one_day() {
        assert_eq!(advance(d(2024, 1, 9)), d(2024, 1, 10));
    }

    #[test]
    fn crosses_month_and_year() {
        // 2023-12-29 is a Friday
        assert_eq!(advance(d(2023, 12, 29)), d(2024, 1, 1));
        // Holidays are not modeled: New Year's Day counts.
        assert!(is_trading_day(d(2024, 1, 1)));
    }

    #[test]
    fn five_days_after_thursday() {
        let days = trading_days_after(d(2024, 1, 4), 5);
        assert_eq!(
            days,
            vec![d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 9), d(2024, 1, 10), d(2024, 1, 11)]
        );
    }

    #[test]
    fn zero_days_is_empty() {
        assert!(trading_days_after(d(2024, 1, 4), 0).is_empty());
    }
}
