// BehaviorDrift (§3): an append-only observation that a metric's observed
// value differs from its baseline value by a significant margin. Severity
// is a magnitude band only — never a quality judgment (§9 open question).

use crate::ids::{BaselineId, DriftId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    Decision,
    Signal,
    Latency,
}

/// `chi_square` for distribution comparisons, `percent_threshold` for
/// latency (no statistical test attempted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMethod {
    ChiSquare,
    PercentThreshold,
}

/// A magnitude band, ordered `Low < Medium < High`. Deliberately does not
/// implement any notion of "good"/"bad" — see the module-level doc comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    Low,
    Medium,
    High,
}

impl DriftSeverity {
    fn rank(&self) -> u8 {
        match self {
            DriftSeverity::Low => 0,
            DriftSeverity::Medium => 1,
            DriftSeverity::High => 2,
        }
    }

    /// Classify severity purely from magnitude, per §4.D's band edges.
    /// Never takes `significance` into account — see §9's open question.
    pub fn from_delta_percent(delta_percent: f64) -> Self {
        let magnitude = delta_percent.abs();
        if magnitude <= 15.0 {
            DriftSeverity::Low
        } else if magnitude <= 30.0 {
            DriftSeverity::Medium
        } else {
            DriftSeverity::High
        }
    }
}

impl PartialOrd for DriftSeverity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DriftSeverity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for DriftSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DriftSeverity::Low => "low",
            DriftSeverity::Medium => "medium",
            DriftSeverity::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorDrift {
    pub drift_id: DriftId,
    pub baseline_id: BaselineId,
    pub agent_id: String,
    pub agent_version: String,
    pub environment: String,
    pub drift_type: DriftType,
    pub metric: String,
    pub baseline_value: f64,
    pub observed_value: f64,
    pub delta: f64,
    pub delta_percent: f64,
    pub significance: f64,
    pub test_method: TestMethod,
    pub severity: DriftSeverity,
    pub detected_at: DateTime<Utc>,
    pub observation_window_start: DateTime<Utc>,
    pub observation_window_end: DateTime<Utc>,
    pub observation_sample_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bands_match_edges() {
        assert_eq!(DriftSeverity::from_delta_percent(15.0), DriftSeverity::Low);
        assert_eq!(DriftSeverity::from_delta_percent(15.1), DriftSeverity::Medium);
        assert_eq!(DriftSeverity::from_delta_percent(30.0), DriftSeverity::Medium);
        assert_eq!(DriftSeverity::from_delta_percent(30.1), DriftSeverity::High);
    }

    #[test]
    fn severity_uses_absolute_magnitude() {
        assert_eq!(DriftSeverity::from_delta_percent(-38.5), DriftSeverity::High);
    }

    #[test]
    fn severity_orders_low_medium_high() {
        assert!(DriftSeverity::Low < DriftSeverity::Medium);
        assert!(DriftSeverity::Medium < DriftSeverity::High);
    }

    #[test]
    fn severity_displays_lowercase() {
        assert_eq!(DriftSeverity::High.to_string(), "high");
    }
}
