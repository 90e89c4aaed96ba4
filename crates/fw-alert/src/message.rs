// Message formatting (§4.E): strictly observational vocabulary. Never
// edit this file to add a judgment word without also updating
// `FORBIDDEN_ALERT_WORDS` in `lib.rs` and its guard test.

use fw_model::{BehaviorDrift, DriftType};

const EPSILON: f64 = 1e-9;

pub fn format_alert_message(drift: &BehaviorDrift) -> String {
    match drift.drift_type {
        DriftType::Decision | DriftType::Signal => format_distribution_message(drift),
        DriftType::Latency => format_latency_message(drift),
    }
}

fn change_clause(drift: &BehaviorDrift) -> String {
    if drift.delta_percent.abs() < EPSILON {
        format!("no change in {}", drift.metric)
    } else if drift.delta_percent > 0.0 {
        format!("observed increase in {}", drift.metric)
    } else {
        format!("observed decrease in {}", drift.metric)
    }
}

fn format_distribution_message(drift: &BehaviorDrift) -> String {
    format!(
        "Agent {agent_id} ({agent_version}, {environment}): {change} — from {baseline:.1}% to {observed:.1}% \
         (statistical significance p={significance:.4}, severity={severity})",
        agent_id = drift.agent_id,
        agent_version = drift.agent_version,
        environment = drift.environment,
        change = change_clause(drift),
        baseline = drift.baseline_value * 100.0,
        observed = drift.observed_value * 100.0,
        significance = drift.significance,
        severity = drift.severity,
    )
}

fn format_latency_message(drift: &BehaviorDrift) -> String {
    format!(
        "Agent {agent_id} ({agent_version}, {environment}): {change} — from {baseline:.2}ms to {observed:.2}ms \
         ({delta_percent:+.1}%, severity={severity})",
        agent_id = drift.agent_id,
        agent_version = drift.agent_version,
        environment = drift.environment,
        change = change_clause(drift),
        baseline = drift.baseline_value,
        observed = drift.observed_value,
        delta_percent = drift.delta_percent,
        severity = drift.severity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fw_model::{BaselineId, DriftId, DriftSeverity, TestMethod};

    fn sample_drift(drift_type: DriftType) -> BehaviorDrift {
        BehaviorDrift {
            drift_id: DriftId::new(),
            baseline_id: BaselineId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            drift_type,
            metric: "tool_selection.api".to_string(),
            baseline_value: 0.65,
            observed_value: 0.40,
            delta: -0.25,
            delta_percent: -38.5,
            significance: 0.0123,
            test_method: TestMethod::ChiSquare,
            severity: DriftSeverity::High,
            detected_at: Utc::now(),
            observation_window_start: Utc::now(),
            observation_window_end: Utc::now(),
            observation_sample_size: 100,
            resolved_at: None,
        }
    }

    #[test]
    fn decision_decrease_uses_neutral_verb() {
        let message = format_alert_message(&sample_drift(DriftType::Decision));
        assert!(message.contains("observed decrease in tool_selection.api"));
        assert!(message.contains("from 65.0% to 40.0%"));
        assert!(message.contains("p=0.0123"));
    }

    #[test]
    fn signal_increase_uses_neutral_verb() {
        let mut drift = sample_drift(DriftType::Signal);
        drift.delta = 0.25;
        drift.delta_percent = 38.5;
        let message = format_alert_message(&drift);
        assert!(message.contains("observed increase in tool_selection.api"));
    }

    #[test]
    fn zero_delta_reports_no_change() {
        let mut drift = sample_drift(DriftType::Decision);
        drift.delta = 0.0;
        drift.delta_percent = 0.0;
        let message = format_alert_message(&drift);
        assert!(message.contains("no change in tool_selection.api"));
    }

    #[test]
    fn latency_message_uses_millisecond_units_and_signed_delta() {
        let mut drift = sample_drift(DriftType::Latency);
        drift.metric = "p95_run_duration_ms".to_string();
        drift.baseline_value = 2000.0;
        drift.observed_value = 3500.0;
        drift.delta = 1500.0;
        drift.delta_percent = 75.0;
        drift.significance = 1.0;
        drift.test_method = TestMethod::PercentThreshold;
        let message = format_alert_message(&drift);
        assert!(message.contains("from 2000.00ms to 3500.00ms"));
        assert!(message.contains("(+75.0%, severity=high)"));
    }
}
