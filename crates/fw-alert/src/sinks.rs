// Optional delivery sinks (§4.E, §10): chat, paging, generic webhook. Each
// is independently enabled via environment variables and delivered
// best-effort — a failed send is logged and never propagated.

use fw_model::{BehaviorDrift, DriftSeverity};
use serde_json::json;
use std::time::Duration;

const SINK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct SinkConfig {
    pub slack: SlackConfig,
    pub pagerduty: PagerDutyConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub channel: String,
}

#[derive(Debug, Clone, Default)]
pub struct PagerDutyConfig {
    pub enabled: bool,
    pub routing_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
}

impl SinkConfig {
    pub fn from_env() -> Self {
        Self {
            slack: SlackConfig {
                enabled: env_flag("PHASE3_SLACK_ENABLED"),
                webhook_url: std::env::var("PHASE3_SLACK_WEBHOOK_URL").ok(),
                channel: std::env::var("PHASE3_SLACK_CHANNEL")
                    .unwrap_or_else(|_| "#agent-alerts".to_string()),
            },
            pagerduty: PagerDutyConfig {
                enabled: env_flag("PHASE3_PAGERDUTY_ENABLED"),
                routing_key: std::env::var("PHASE3_PAGERDUTY_ROUTING_KEY").ok(),
            },
            webhook: WebhookConfig {
                enabled: env_flag("PHASE3_WEBHOOK_ENABLED"),
                url: std::env::var("PHASE3_WEBHOOK_URL").ok(),
            },
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn severity_emoji(severity: DriftSeverity) -> &'static str {
    match severity {
        DriftSeverity::Low => "ℹ️",
        DriftSeverity::Medium => "⚠️",
        DriftSeverity::High => "🔔",
    }
}

fn pagerduty_severity(severity: DriftSeverity) -> &'static str {
    match severity {
        DriftSeverity::Low => "info",
        DriftSeverity::Medium => "warning",
        DriftSeverity::High => "error",
    }
}

pub async fn send_slack(client: &reqwest::Client, config: &SlackConfig, drift: &BehaviorDrift) {
    let Some(webhook_url) = &config.webhook_url else {
        tracing::debug!("slack webhook url not configured, skipping");
        return;
    };
    let emoji = severity_emoji(drift.severity);

    let payload = json!({
        "channel": config.channel,
        "text": format!("{emoji} Behavioral Drift Detected"),
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("{emoji} Behavioral Drift Detected") },
            },
            {
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*Agent:*\n{} v{}", drift.agent_id, drift.agent_version) },
                    { "type": "mrkdwn", "text": format!("*Environment:*\n{}", drift.environment) },
                    { "type": "mrkdwn", "text": format!("*Metric:*\n{}", drift.metric) },
                    { "type": "mrkdwn", "text": format!("*Severity:*\n{}", drift.severity) },
                ],
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Observed change:* {:.2}% \u{2192} {:.2}% ({:+.1}%)\n*Statistical significance:* p={:.4}\n*Sample size:* {} runs",
                        drift.baseline_value * 100.0,
                        drift.observed_value * 100.0,
                        drift.delta_percent,
                        drift.significance,
                        drift.observation_sample_size,
                    ),
                },
            },
        ],
    });

    match client
        .post(webhook_url)
        .json(&payload)
        .timeout(SINK_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!(drift_id = %drift.drift_id, "slack alert sent");
        }
        Ok(resp) => {
            tracing::warn!(drift_id = %drift.drift_id, status = %resp.status(), "slack alert rejected");
        }
        Err(err) => {
            tracing::warn!(drift_id = %drift.drift_id, error = %err, "failed to send slack alert");
        }
    }
}

pub async fn send_pagerduty(
    client: &reqwest::Client,
    config: &PagerDutyConfig,
    drift: &BehaviorDrift,
) {
    let Some(routing_key) = &config.routing_key else {
        tracing::debug!("pagerduty routing key not configured, skipping");
        return;
    };

    let payload = json!({
        "routing_key": routing_key,
        "event_action": "trigger",
        "payload": {
            "summary": format!(
                "Behavioral drift detected: {} v{} - {}",
                drift.agent_id, drift.agent_version, drift.metric
            ),
            "severity": pagerduty_severity(drift.severity),
            "source": "agent behavior observability platform",
            "custom_details": {
                "agent_id": drift.agent_id,
                "agent_version": drift.agent_version,
                "environment": drift.environment,
                "metric": drift.metric,
                "baseline_value": drift.baseline_value,
                "observed_value": drift.observed_value,
                "delta_percent": drift.delta_percent,
                "significance": drift.significance,
                "baseline_id": drift.baseline_id.to_string(),
                "drift_id": drift.drift_id.to_string(),
            },
        },
    });

    match client
        .post("https://events.pagerduty.com/v2/enqueue")
        .json(&payload)
        .timeout(SINK_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!(drift_id = %drift.drift_id, "pagerduty alert sent");
        }
        Ok(resp) => {
            tracing::warn!(drift_id = %drift.drift_id, status = %resp.status(), "pagerduty alert rejected");
        }
        Err(err) => {
            tracing::warn!(drift_id = %drift.drift_id, error = %err, "failed to send pagerduty alert");
        }
    }
}

pub async fn send_generic_webhook(
    client: &reqwest::Client,
    config: &WebhookConfig,
    message: &str,
    drift: &BehaviorDrift,
) {
    let Some(url) = &config.url else {
        tracing::debug!("generic webhook url not configured, skipping");
        return;
    };

    let payload = json!({
        "event": "drift_detected",
        "drift_id": drift.drift_id.to_string(),
        "baseline_id": drift.baseline_id.to_string(),
        "agent_id": drift.agent_id,
        "agent_version": drift.agent_version,
        "environment": drift.environment,
        "drift_type": drift.drift_type,
        "metric": drift.metric,
        "baseline_value": drift.baseline_value,
        "observed_value": drift.observed_value,
        "delta": drift.delta,
        "delta_percent": drift.delta_percent,
        "significance": drift.significance,
        "test_method": drift.test_method,
        "severity": drift.severity,
        "detected_at": drift.detected_at,
        "observation_window_start": drift.observation_window_start,
        "observation_window_end": drift.observation_window_end,
        "observation_sample_size": drift.observation_sample_size,
        "message": message,
    });

    match client
        .post(url)
        .json(&payload)
        .timeout(SINK_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!(drift_id = %drift.drift_id, "generic webhook alert sent");
        }
        Ok(resp) => {
            tracing::warn!(drift_id = %drift.drift_id, status = %resp.status(), "generic webhook alert rejected");
        }
        Err(err) => {
            tracing::warn!(drift_id = %drift.drift_id, error = %err, "failed to send generic webhook alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_has_no_url_by_default() {
        let config = SlackConfig::default();
        assert!(!config.enabled);
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn severity_emoji_covers_every_band() {
        assert_eq!(severity_emoji(DriftSeverity::Low), "ℹ️");
        assert_eq!(severity_emoji(DriftSeverity::Medium), "⚠️");
        assert_eq!(severity_emoji(DriftSeverity::High), "🔔");
    }

    #[test]
    fn pagerduty_severity_maps_high_to_error() {
        assert_eq!(pagerduty_severity(DriftSeverity::High), "error");
    }
}
