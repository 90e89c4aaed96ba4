// Drift Engine (component D): compares an observed profile against an
// active baseline's referenced profile and emits BehaviorDrift events.
// Options are iterated in sorted order so output is deterministic; every
// event from one `detect` call shares the same `detected_at` and is
// persisted in a single transaction.

use crate::error::DriftError;
use crate::thresholds::{KindThresholds, SeverityBands, ThresholdConfig};
use crate::stats::chi_square_p_value;
use chrono::{DateTime, Utc};
use fw_model::{
    BehaviorBaseline, BehaviorDrift, BehaviorProfile, Distribution, DriftId, DriftSeverity,
    DriftType, TestMethod,
};
use fw_store::Store;
use std::collections::{BTreeMap, BTreeSet};

pub struct DriftEngine<'a> {
    store: &'a Store,
    config: ThresholdConfig,
}

impl<'a> DriftEngine<'a> {
    pub fn new(store: &'a Store, config: ThresholdConfig) -> Self {
        Self { store, config }
    }

    /// `detect(baseline, observed_window_start, observed_window_end,
    /// min_sample_size) → [DriftEvent]` — §4.D's operation.
    pub fn detect(
        &self,
        baseline: &BehaviorBaseline,
        observed_window_start: DateTime<Utc>,
        observed_window_end: DateTime<Utc>,
        min_sample_size: u64,
    ) -> Result<Vec<BehaviorDrift>, DriftError> {
        let observed = fw_profile::build_profile(
            self.store,
            &baseline.agent_id,
            &baseline.agent_version,
            &baseline.environment,
            observed_window_start,
            observed_window_end,
            min_sample_size,
        )?;

        let baseline_profile = self
            .store
            .get_profile(baseline.profile_id)?
            .ok_or_else(|| DriftError::ProfileNotFound(baseline.baseline_id.to_string()))?;

        let detected_at = Utc::now();
        let mut events = Vec::new();

        events.extend(self.compare_distributions(
            baseline,
            &baseline_profile.decision_distributions,
            &observed.decision_distributions,
            DriftType::Decision,
            self.config.decision,
            &observed,
            detected_at,
        ));
        events.extend(self.compare_distributions(
            baseline,
            &baseline_profile.signal_distributions,
            &observed.signal_distributions,
            DriftType::Signal,
            self.config.signal,
            &observed,
            detected_at,
        ));
        events.extend(self.compare_latency(baseline, &baseline_profile, &observed, detected_at));

        if !events.is_empty() {
            self.store.put_drift_events(&events)?;
        }
        tracing::info!(
            agent_id = %baseline.agent_id,
            baseline_id = %baseline.baseline_id,
            events = events.len(),
            "drift detection pass complete"
        );
        Ok(events)
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_distributions(
        &self,
        baseline: &BehaviorBaseline,
        baseline_dist: &Distribution,
        observed_dist: &Distribution,
        drift_type: DriftType,
        thresholds: KindThresholds,
        observed_profile: &BehaviorProfile,
        detected_at: DateTime<Utc>,
    ) -> Vec<BehaviorDrift> {
        let mut events = Vec::new();

        for tag in baseline_dist.keys() {
            let Some(baseline_options) = baseline_dist.get(tag) else {
                continue;
            };
            let Some(observed_options) = observed_dist.get(tag) else {
                continue;
            };
            if baseline_options.is_empty() || observed_options.is_empty() {
                continue;
            }

            let union: BTreeSet<&String> = baseline_options
                .keys()
                .chain(observed_options.keys())
                .collect();
            let expected: Vec<f64> = union
                .iter()
                .map(|opt| *baseline_options.get(*opt).unwrap_or(&0.0))
                .collect();
            let observed_probs: Vec<f64> = union
                .iter()
                .map(|opt| *observed_options.get(*opt).unwrap_or(&0.0))
                .collect();
            let p = chi_square_p_value(&expected, &observed_probs);

            for (i, option) in union.into_iter().enumerate() {
                let baseline_value = expected[i];
                let observed_value = observed_probs[i];
                let delta = observed_value - baseline_value;
                let delta_percent = if baseline_value > 0.0 {
                    delta / baseline_value * 100.0
                } else {
                    0.0
                };

                if !is_significant(p, delta_percent.abs(), thresholds) {
                    continue;
                }

                events.push(BehaviorDrift {
                    drift_id: DriftId::new(),
                    baseline_id: baseline.baseline_id,
                    agent_id: baseline.agent_id.clone(),
                    agent_version: baseline.agent_version.clone(),
                    environment: baseline.environment.clone(),
                    drift_type,
                    metric: format!("{tag}.{option}"),
                    baseline_value,
                    observed_value,
                    delta,
                    delta_percent,
                    significance: p,
                    test_method: TestMethod::ChiSquare,
                    severity: classify_severity(delta_percent, self.config.severity),
                    detected_at,
                    observation_window_start: observed_profile.window_start,
                    observation_window_end: observed_profile.window_end,
                    observation_sample_size: observed_profile.sample_size,
                    resolved_at: None,
                });
            }
        }

        events
    }

    fn compare_latency(
        &self,
        baseline: &BehaviorBaseline,
        baseline_profile: &BehaviorProfile,
        observed_profile: &BehaviorProfile,
        detected_at: DateTime<Utc>,
    ) -> Vec<BehaviorDrift> {
        let mut events = Vec::new();
        let metrics: [(&str, f64, f64); 2] = [
            (
                "mean_run_duration_ms",
                baseline_profile.latency_stats.mean,
                observed_profile.latency_stats.mean,
            ),
            (
                "p95_run_duration_ms",
                baseline_profile.latency_stats.p95,
                observed_profile.latency_stats.p95,
            ),
        ];

        for (metric, baseline_value, observed_value) in metrics {
            if baseline_value <= 0.0 || observed_value <= 0.0 {
                continue;
            }
            let delta = observed_value - baseline_value;
            let delta_percent = delta / baseline_value * 100.0;
            if !is_significant(1.0, delta_percent.abs(), self.config.latency) {
                continue;
            }

            events.push(BehaviorDrift {
                drift_id: DriftId::new(),
                baseline_id: baseline.baseline_id,
                agent_id: baseline.agent_id.clone(),
                agent_version: baseline.agent_version.clone(),
                environment: baseline.environment.clone(),
                drift_type: DriftType::Latency,
                metric: metric.to_string(),
                baseline_value,
                observed_value,
                delta,
                delta_percent,
                significance: 1.0,
                test_method: TestMethod::PercentThreshold,
                severity: classify_severity(delta_percent, self.config.severity),
                detected_at,
                observation_window_start: observed_profile.window_start,
                observation_window_end: observed_profile.window_end,
                observation_sample_size: observed_profile.sample_size,
                resolved_at: None,
            });
        }

        events
    }
}

/// A `p` of `1.0` means "no statistical test attempted" and always skips
/// the p-value gate, whether because the kind has none (latency) or the
/// chi-square test degenerated.
fn is_significant(p: f64, abs_delta_percent: f64, thresholds: KindThresholds) -> bool {
    let magnitude_ok = abs_delta_percent >= thresholds.min_delta_percent;
    match thresholds.max_p_value {
        None => magnitude_ok,
        Some(max_p) => {
            if (p - 1.0).abs() < f64::EPSILON {
                magnitude_ok
            } else {
                p <= max_p && magnitude_ok
            }
        }
    }
}

fn classify_severity(delta_percent: f64, bands: SeverityBands) -> DriftSeverity {
    let magnitude = delta_percent.abs();
    if magnitude <= bands.low_max {
        DriftSeverity::Low
    } else if magnitude <= bands.medium_max {
        DriftSeverity::Medium
    } else {
        DriftSeverity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fw_baseline::BaselineManager;
    use fw_model::{AgentDecision, AgentRun, DecisionId, DecisionType, RunId, RunStatus};

    fn run_with_decision(agent_id: &str, started_at: DateTime<Utc>, selected: &str) -> AgentRun {
        AgentRun {
            run_id: RunId::new(),
            agent_id: agent_id.to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            status: RunStatus::Success,
            started_at,
            ended_at: Some(started_at + Duration::milliseconds(2000)),
            created_at: started_at,
            steps: vec![],
            failure: None,
            decisions: vec![AgentDecision {
                decision_id: DecisionId::new(),
                step_id: None,
                decision_type: DecisionType::ToolSelection,
                selected: selected.to_string(),
                reason_code: "cost_optimization".to_string(),
                confidence: None,
                metadata: Default::default(),
            }],
            quality_signals: vec![],
        }
    }

    #[test]
    fn decision_shift_is_detected_as_high_severity() {
        let store = Store::open_in_memory().unwrap();
        let manager = BaselineManager::new(&store);

        let baseline_window_start = Utc::now() - Duration::days(2);
        for i in 0..150 {
            let selected = if i < 98 { "api" } else { "cache" }; // ~0.653 / 0.347
            store
                .put_run(&run_with_decision(
                    "agent-1",
                    baseline_window_start + Duration::seconds(i),
                    selected,
                ))
                .unwrap();
        }
        let baseline_profile = fw_profile::build_profile(
            &store,
            "agent-1",
            "1.0.0",
            "prod",
            baseline_window_start,
            baseline_window_start + Duration::days(1),
            1,
        )
        .unwrap();
        store.put_profile(&baseline_profile).unwrap();
        let baseline = manager
            .create(
                baseline_profile.profile_id,
                "agent-1",
                "1.0.0",
                "prod",
                "manual",
                None,
                None,
                true,
            )
            .unwrap();

        let observed_window_start = Utc::now();
        for i in 0..100 {
            let selected = if i < 40 { "api" } else { "cache" };
            store
                .put_run(&run_with_decision(
                    "agent-1",
                    observed_window_start + Duration::seconds(i),
                    selected,
                ))
                .unwrap();
        }

        let engine = DriftEngine::new(&store, ThresholdConfig::default());
        let events = engine
            .detect(
                &baseline,
                observed_window_start,
                observed_window_start + Duration::days(1),
                1,
            )
            .unwrap();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.severity == DriftSeverity::High));
        assert!(events
            .iter()
            .any(|e| e.metric == "tool_selection.api" && e.delta_percent < 0.0));
        assert!(events
            .iter()
            .any(|e| e.metric == "tool_selection.cache" && e.delta_percent > 0.0));
    }

    #[test]
    fn stable_behavior_yields_no_drift() {
        let store = Store::open_in_memory().unwrap();
        let manager = BaselineManager::new(&store);

        let baseline_window_start = Utc::now() - Duration::days(2);
        for i in 0..150 {
            let selected = if i < 98 { "api" } else { "cache" };
            store
                .put_run(&run_with_decision(
                    "agent-1",
                    baseline_window_start + Duration::seconds(i),
                    selected,
                ))
                .unwrap();
        }
        let baseline_profile = fw_profile::build_profile(
            &store,
            "agent-1",
            "1.0.0",
            "prod",
            baseline_window_start,
            baseline_window_start + Duration::days(1),
            1,
        )
        .unwrap();
        store.put_profile(&baseline_profile).unwrap();
        let baseline = manager
            .create(
                baseline_profile.profile_id,
                "agent-1",
                "1.0.0",
                "prod",
                "manual",
                None,
                None,
                true,
            )
            .unwrap();

        let observed_window_start = Utc::now();
        for i in 0..100 {
            let selected = if i < 65 { "api" } else { "cache" };
            store
                .put_run(&run_with_decision(
                    "agent-1",
                    observed_window_start + Duration::seconds(i),
                    selected,
                ))
                .unwrap();
        }

        let engine = DriftEngine::new(&store, ThresholdConfig::default());
        let events = engine
            .detect(
                &baseline,
                observed_window_start,
                observed_window_start + Duration::days(1),
                1,
            )
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn is_significant_skips_p_gate_at_sentinel() {
        let thresholds = KindThresholds {
            max_p_value: Some(0.05),
            min_delta_percent: 10.0,
        };
        assert!(is_significant(1.0, 25.0, thresholds));
        assert!(!is_significant(1.0, 5.0, thresholds));
        assert!(!is_significant(0.5, 25.0, thresholds));
    }

    #[test]
    fn latency_has_no_p_value_gate() {
        let thresholds = KindThresholds {
            max_p_value: None,
            min_delta_percent: 20.0,
        };
        assert!(is_significant(0.9, 75.0, thresholds));
        assert!(!is_significant(0.9, 5.0, thresholds));
    }
}
