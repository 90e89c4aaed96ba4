// Threshold Config (component F): significance/magnitude/severity
// thresholds, with a YAML document merged field-by-field over the §4.D
// compiled-in defaults. Loaded once per engine instance.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindThresholds {
    /// `None` means the kind has no p-value gate (latency).
    pub max_p_value: Option<f64>,
    pub min_delta_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityBands {
    pub low_max: f64,
    pub medium_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub decision: KindThresholds,
    pub signal: KindThresholds,
    pub latency: KindThresholds,
    pub severity: SeverityBands,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            decision: KindThresholds {
                max_p_value: Some(0.05),
                min_delta_percent: 10.0,
            },
            signal: KindThresholds {
                max_p_value: Some(0.05),
                min_delta_percent: 15.0,
            },
            latency: KindThresholds {
                max_p_value: None,
                min_delta_percent: 20.0,
            },
            severity: SeverityBands {
                low_max: 15.0,
                medium_max: 30.0,
            },
        }
    }
}

/// Mirrors `ThresholdConfig` but with every field optional, so a document
/// only needs to specify the values it wants to override.
#[derive(Debug, Default, Deserialize)]
struct ThresholdDocument {
    decision: Option<KindThresholdsDoc>,
    signal: Option<KindThresholdsDoc>,
    latency: Option<KindThresholdsDoc>,
    severity: Option<SeverityBandsDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct KindThresholdsDoc {
    max_p_value: Option<f64>,
    min_delta_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SeverityBandsDoc {
    low_max: Option<f64>,
    medium_max: Option<f64>,
}

impl ThresholdConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let doc: ThresholdDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::merge(doc))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::error::DriftError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&raw)?)
    }

    fn merge(doc: ThresholdDocument) -> Self {
        let defaults = Self::default();
        Self {
            decision: merge_kind(defaults.decision, doc.decision),
            signal: merge_kind(defaults.signal, doc.signal),
            latency: merge_kind(defaults.latency, doc.latency),
            severity: SeverityBands {
                low_max: doc
                    .severity
                    .as_ref()
                    .and_then(|s| s.low_max)
                    .unwrap_or(defaults.severity.low_max),
                medium_max: doc
                    .severity
                    .as_ref()
                    .and_then(|s| s.medium_max)
                    .unwrap_or(defaults.severity.medium_max),
            },
        }
    }
}

fn merge_kind(default: KindThresholds, doc: Option<KindThresholdsDoc>) -> KindThresholds {
    match doc {
        None => default,
        Some(doc) => KindThresholds {
            max_p_value: doc.max_p_value.or(default.max_p_value),
            min_delta_percent: doc.min_delta_percent.unwrap_or(default.min_delta_percent),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = ThresholdConfig::default();
        assert_eq!(cfg.decision.max_p_value, Some(0.05));
        assert_eq!(cfg.decision.min_delta_percent, 10.0);
        assert_eq!(cfg.signal.min_delta_percent, 15.0);
        assert_eq!(cfg.latency.max_p_value, None);
        assert_eq!(cfg.latency.min_delta_percent, 20.0);
    }

    #[test]
    fn empty_document_falls_back_to_defaults() {
        let cfg = ThresholdConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, ThresholdConfig::default());
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let yaml = "decision:\n  min_delta_percent: 5.0\n";
        let cfg = ThresholdConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.decision.min_delta_percent, 5.0);
        assert_eq!(cfg.decision.max_p_value, Some(0.05));
        assert_eq!(cfg.signal, ThresholdConfig::default().signal);
    }
}
