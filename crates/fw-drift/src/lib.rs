//! Drift Engine (component D) and Threshold Config (component F): compares
//! an observed window against an active baseline's profile and reports
//! statistically and practically significant behavior changes.

mod engine;
mod error;
mod stats;
mod thresholds;

pub use engine::DriftEngine;
pub use error::DriftError;
pub use thresholds::{KindThresholds, SeverityBands, ThresholdConfig};
