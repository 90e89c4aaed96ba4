//! Alert Emitter (component E): turns a `BehaviorDrift` into a neutral,
//! observational message, always logs it, and best-effort delivers it to
//! whichever sinks are enabled via environment configuration. A sink
//! failure is logged and never escalates past this module.

mod message;
mod sinks;

pub use message::format_alert_message;
pub use sinks::{PagerDutyConfig, SinkConfig, SlackConfig, WebhookConfig};

use fw_model::{BehaviorDrift, DriftSeverity};

/// Words the vocabulary contract forbids in any alert surface (§4.E).
pub const FORBIDDEN_ALERT_WORDS: &[&str] = &[
    "better", "worse", "correct", "incorrect", "regression", "degraded",
];

pub struct AlertEmitter {
    client: reqwest::Client,
    config: SinkConfig,
}

impl AlertEmitter {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(SinkConfig::from_env())
    }

    /// Logs the drift, then fans out to every enabled sink. Each sink call
    /// is independent; one sink failing does not stop the others.
    pub async fn emit(&self, drift: &BehaviorDrift) {
        let message = format_alert_message(drift);
        self.log_alert(&message, drift);

        if self.config.slack.enabled {
            sinks::send_slack(&self.client, &self.config.slack, drift).await;
        }
        if self.config.pagerduty.enabled {
            sinks::send_pagerduty(&self.client, &self.config.pagerduty, drift).await;
        }
        if self.config.webhook.enabled {
            sinks::send_generic_webhook(&self.client, &self.config.webhook, &message, drift).await;
        }
    }

    fn log_alert(&self, message: &str, drift: &BehaviorDrift) {
        match drift.severity {
            DriftSeverity::High => tracing::warn!(
                drift_id = %drift.drift_id,
                agent_id = %drift.agent_id,
                agent_version = %drift.agent_version,
                environment = %drift.environment,
                drift_type = ?drift.drift_type,
                metric = %drift.metric,
                delta_percent = drift.delta_percent,
                severity = %drift.severity,
                significance = drift.significance,
                "{message}",
            ),
            DriftSeverity::Low | DriftSeverity::Medium => tracing::info!(
                drift_id = %drift.drift_id,
                agent_id = %drift.agent_id,
                agent_version = %drift.agent_version,
                environment = %drift.environment,
                drift_type = ?drift.drift_type,
                metric = %drift.metric,
                delta_percent = drift.delta_percent,
                severity = %drift.severity,
                significance = drift.significance,
                "{message}",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fw_model::{BaselineId, DriftId, DriftType, TestMethod};

    fn sample_drift(severity: DriftSeverity) -> BehaviorDrift {
        BehaviorDrift {
            drift_id: DriftId::new(),
            baseline_id: BaselineId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            drift_type: DriftType::Decision,
            metric: "tool_selection.api".to_string(),
            baseline_value: 0.65,
            observed_value: 0.40,
            delta: -0.25,
            delta_percent: -38.5,
            significance: 0.0123,
            test_method: TestMethod::ChiSquare,
            severity,
            detected_at: Utc::now(),
            observation_window_start: Utc::now(),
            observation_window_end: Utc::now(),
            observation_sample_size: 100,
            resolved_at: None,
        }
    }

    #[test]
    fn formatted_message_never_contains_forbidden_words() {
        for severity in [DriftSeverity::Low, DriftSeverity::Medium, DriftSeverity::High] {
            let message = format_alert_message(&sample_drift(severity)).to_lowercase();
            for word in FORBIDDEN_ALERT_WORDS {
                assert!(!message.contains(word), "message contained forbidden word {word}");
            }
        }
    }

    #[tokio::test]
    async fn emit_with_no_sinks_configured_only_logs() {
        let emitter = AlertEmitter::new(SinkConfig::default());
        emitter.emit(&sample_drift(DriftSeverity::Medium)).await;
    }
}
