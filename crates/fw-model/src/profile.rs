// BehaviorProfile (§3): a statistical snapshot over a window. Immutable
// after creation — the Profile Builder (fw-profile) is the only writer.

use crate::ids::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `tag → (option → probability)`. The inner mapping sums to 1.0 (±1e-6)
/// or is empty — an empty tag means no events of that tag were observed
/// in the window, and is omitted from the profile rather than stored with
/// a zeroed-out distribution.
pub type Distribution = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub sample_count: u64,
}

impl LatencyStats {
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            sample_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub profile_id: ProfileId,
    pub agent_id: String,
    pub agent_version: String,
    pub environment: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub sample_size: u64,
    pub decision_distributions: Distribution,
    pub signal_distributions: Distribution,
    pub latency_stats: LatencyStats,
    pub created_at: DateTime<Utc>,
}

impl BehaviorProfile {
    /// Every non-empty tag's inner distribution sums to 1.0 within
    /// tolerance — the invariant checked in §8's testable properties.
    pub fn distributions_are_normalized(&self) -> bool {
        Self::check(&self.decision_distributions) && Self::check(&self.signal_distributions)
    }

    fn check(dist: &Distribution) -> bool {
        dist.values().all(|options| {
            options.is_empty() || (options.values().sum::<f64>() - 1.0).abs() <= 1e-6
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(decision: Distribution) -> BehaviorProfile {
        BehaviorProfile {
            profile_id: ProfileId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            window_start: Utc::now(),
            window_end: Utc::now(),
            sample_size: 100,
            decision_distributions: decision,
            signal_distributions: Distribution::new(),
            latency_stats: LatencyStats::empty(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn normalized_distribution_passes() {
        let mut inner = BTreeMap::new();
        inner.insert("api".to_string(), 0.65);
        inner.insert("cache".to_string(), 0.35);
        let mut dist = Distribution::new();
        dist.insert("tool_selection".to_string(), inner);
        assert!(profile_with(dist).distributions_are_normalized());
    }

    #[test]
    fn unnormalized_distribution_fails() {
        let mut inner = BTreeMap::new();
        inner.insert("api".to_string(), 0.5);
        inner.insert("cache".to_string(), 0.2);
        let mut dist = Distribution::new();
        dist.insert("tool_selection".to_string(), inner);
        assert!(!profile_with(dist).distributions_are_normalized());
    }

    #[test]
    fn empty_inner_distribution_passes() {
        let mut dist = Distribution::new();
        dist.insert("tool_selection".to_string(), BTreeMap::new());
        assert!(profile_with(dist).distributions_are_normalized());
    }
}
