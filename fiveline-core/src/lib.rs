//! Fiveline Core: what-if projection of closes and moving averages.
//!
//! Given a security's daily history and up to five per-day targets (an
//! absolute close or a percent move), this crate:
//! - advances past weekends to the next trading days
//! - synthesizes one projected bar per target, chaining off the previous close
//! - appends the projection to the history as one ordered series
//! - computes MA5/10/20/60/120 over the combined series
//! - trims to the display window (look-back plus projected days)
//!
//! The pipeline is a pure function of its inputs. History retrieval, with
//! its TTL cache and retry policy, lives in [`data`] and is driven by the
//! caller.

pub mod calendar;
pub mod config;
pub mod data;
pub mod display;
pub mod domain;
pub mod indicators;
pub mod moving_average;
pub mod pipeline;
pub mod projection;
pub mod series;

pub use display::{DisplayResult, ProjectedRow, DEFAULT_LOOKBACK, LOOKBACK_CHOICES};
pub use domain::{Bar, BarOrigin, PredictionTarget, MAX_TARGETS};
pub use moving_average::{MovingAverageSet, MA_WINDOWS};
pub use pipeline::{run, PipelineError, PipelineOutcome};
pub use series::Series;
