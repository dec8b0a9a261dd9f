//! Domain types for Fiveline

pub mod bar;
pub mod target;

pub use bar::{Bar, BarOrigin};
pub use target::{PredictionTarget, TargetParseError};

/// Most targets a single projection accepts.
pub const MAX_TARGETS: usize = 5;
