//! Prediction targets: the user's what-if input for one future trading day.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target for a single projected day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PredictionTarget {
    /// Close at this price. Non-positive values leave the price unchanged.
    #[serde(rename = "price")]
    AbsolutePrice(f64),
    /// Close this many percent away from the previous close.
    #[serde(rename = "percent")]
    PercentChange(f64),
}

impl PredictionTarget {
    /// Resolve the close this target produces when the previous close is `current`.
    ///
    /// `AbsolutePrice` with a value <= 0 is a no-op and returns `current`.
    pub fn resolve(&self, current: f64) -> f64 {
        match *self {
            PredictionTarget::AbsolutePrice(v) if v > 0.0 => v,
            PredictionTarget::AbsolutePrice(_) => current,
            PredictionTarget::PercentChange(p) => current * (1.0 + p / 100.0),
        }
    }

    /// True for an absolute price that will be ignored (<= 0 or NaN).
    pub fn is_degenerate(&self) -> bool {
        matches!(*self, PredictionTarget::AbsolutePrice(v) if !(v > 0.0))
    }
}

impl fmt::Display for PredictionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionTarget::AbsolutePrice(v) => write!(f, "price:{v}"),
            PredictionTarget::PercentChange(p) => write!(f, "pct:{p:+}"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TargetParseError {
    #[error("empty target")]
    Empty,

    #[error("unknown target kind '{0}' (expected price or pct)")]
    UnknownKind(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parses `price:11.0`, `pct:5`, `percent:-2.5`, `5%` or a bare price `11.0`.
impl FromStr for PredictionTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }

        let number = |raw: &str| -> Result<f64, TargetParseError> {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| TargetParseError::InvalidNumber(raw.trim().to_string()))
        };

        if let Some((kind, value)) = s.split_once(':') {
            return match kind.trim().to_ascii_lowercase().as_str() {
                "price" | "p" => Ok(PredictionTarget::AbsolutePrice(number(value)?)),
                "pct" | "percent" | "%" => Ok(PredictionTarget::PercentChange(number(
                    value.trim().trim_end_matches('%'),
                )?)),
                other => Err(TargetParseError::UnknownKind(other.to_string())),
            };
        }

        match s.strip_suffix('%') {
            Some(pct) => Ok(PredictionTarget::PercentChange(number(pct)?)),
            None => Ok(PredictionTarget::AbsolutePrice(number(s)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_resolves_against_current() {
        let t = PredictionTarget::PercentChange(5.0);
        assert!((t.resolve(10.0) - 10.5).abs() < 1e-12);
        assert_eq!(PredictionTarget::PercentChange(0.0).resolve(10.0), 10.0);
    }

    #[test]
    fn non_positive_price_is_noop() {
        assert_eq!(PredictionTarget::AbsolutePrice(0.0).resolve(10.0), 10.0);
        assert_eq!(PredictionTarget::AbsolutePrice(-3.0).resolve(10.0), 10.0);
        assert!(PredictionTarget::AbsolutePrice(0.0).is_degenerate());
        assert!(!PredictionTarget::AbsolutePrice(11.0).is_degenerate());
        assert!(!PredictionTarget::PercentChange(-100.0).is_degenerate());
    }

    #[test]
    fn parse_forms() {
        assert_eq!(
            "price:11.0".parse::<PredictionTarget>(),
            Ok(PredictionTarget::AbsolutePrice(11.0))
        );
        assert_eq!(
            "pct:5".parse::<PredictionTarget>(),
            Ok(PredictionTarget::PercentChange(5.0))
        );
        assert_eq!(
            "percent:-2.5%".parse::<PredictionTarget>(),
            Ok(PredictionTarget::PercentChange(-2.5))
        );
        assert_eq!(
            "5%".parse::<PredictionTarget>(),
            Ok(PredictionTarget::PercentChange(5.0))
        );
        assert_eq!(
            " 12.34 ".parse::<PredictionTarget>(),
            Ok(PredictionTarget::AbsolutePrice(12.34))
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<PredictionTarget>(), Err(TargetParseError::Empty));
        assert_eq!(
            "vol:3".parse::<PredictionTarget>(),
            Err(TargetParseError::UnknownKind("vol".into()))
        );
        assert_eq!(
            "pct:abc".parse::<PredictionTarget>(),
            Err(TargetParseError::InvalidNumber("abc".into()))
        );
    }

    #[test]
    fn serde_uses_kind_value_shape() {
        let json = serde_json::to_string(&PredictionTarget::PercentChange(5.0)).unwrap();
        assert_eq!(json, r#"{"kind":"percent","value":5.0}"#);
        let back: PredictionTarget =
            serde_json::from_str(r#"{"kind":"price","value":11.0}"#).unwrap();
        assert_eq!(back, PredictionTarget::AbsolutePrice(11.0));
    }
}
