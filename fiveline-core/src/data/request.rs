//! History request: the one contract between the pipeline's caller and a
//! data provider.

use super::provider::DataError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar days fetched beyond the look-back so long averages can warm up.
pub const DEFAULT_PADDING_DAYS: u32 = 150;

/// Price adjustment policy for splits and dividends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    /// Prices as traded.
    None,
    /// Anchored to the latest bar: recent prices match the tape.
    #[default]
    Forward,
    /// Anchored to the earliest bar of the range.
    Backward,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Adjustment::None => "none",
            Adjustment::Forward => "forward",
            Adjustment::Backward => "backward",
        };
        f.write_str(s)
    }
}

impl FromStr for Adjustment {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "raw" => Ok(Adjustment::None),
            "forward" | "qfq" => Ok(Adjustment::Forward),
            "backward" | "hfq" => Ok(Adjustment::Backward),
            other => Err(DataError::InvalidRequest(format!(
                "unknown adjustment '{other}' (expected none, forward or backward)"
            ))),
        }
    }
}

/// Check that `symbol` is a plain ticker: ASCII letters, digits and
/// `.` `_` `^` `=` `-`, with no `..` run. Symbols end up in cache paths and
/// provider URLs, so anything else is refused.
pub fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    if symbol.is_empty() {
        return Err(DataError::InvalidRequest("empty symbol".into()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '^' | '=' | '-');
    if !symbol.chars().all(allowed) || symbol.contains("..") || symbol == "." {
        return Err(DataError::InvalidRequest(format!(
            "invalid symbol '{symbol}' (allowed: letters, digits, . _ ^ = -)"
        )));
    }
    Ok(())
}

/// What to fetch: symbol, inclusive date range, adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub adjustment: Adjustment,
}

impl HistoryRequest {
    /// Build a request; the symbol is trimmed and must pass [`validate_symbol`].
    pub fn new(
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        adjustment: Adjustment,
    ) -> Result<Self, DataError> {
        let symbol = symbol.trim();
        validate_symbol(symbol)?;
        if start > end {
            return Err(DataError::InvalidRequest(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            start,
            end,
            adjustment,
        })
    }

    /// Request ending `today` and reaching back `lookback + padding_days`
    /// calendar days.
    pub fn for_lookback(
        symbol: &str,
        today: NaiveDate,
        lookback: usize,
        padding_days: u32,
        adjustment: Adjustment,
    ) -> Result<Self, DataError> {
        let span = lookback as i64 + padding_days as i64;
        Self::new(symbol, today - Duration::days(span), today, adjustment)
    }

    /// True if `date` falls inside the inclusive range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
