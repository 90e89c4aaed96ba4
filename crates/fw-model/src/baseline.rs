// BehaviorBaseline (§3): an approved, (mostly) immutable reference point
// for drift comparison. Only `is_active`, `approved_by`, `approved_at` may
// change after creation.

use crate::ids::{BaselineId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineType {
    Version,
    TimeWindow,
    Manual,
}

impl BaselineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineType::Version => "version",
            BaselineType::TimeWindow => "time_window",
            BaselineType::Manual => "manual",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "version" => Some(BaselineType::Version),
            "time_window" => Some(BaselineType::TimeWindow),
            "manual" => Some(BaselineType::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorBaseline {
    pub baseline_id: BaselineId,
    pub profile_id: ProfileId,
    pub agent_id: String,
    pub agent_version: String,
    pub environment: String,
    pub baseline_type: BaselineType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The `(agent_id, agent_version, environment)` key baselines are scoped
/// by — at most one baseline with `is_active=true` may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BaselineKey {
    pub agent_id: String,
    pub agent_version: String,
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_type_round_trips() {
        for bt in [
            BaselineType::Version,
            BaselineType::TimeWindow,
            BaselineType::Manual,
        ] {
            assert_eq!(BaselineType::from_str_loose(bt.as_str()), Some(bt));
        }
    }

    #[test]
    fn unknown_baseline_type_rejected() {
        assert_eq!(BaselineType::from_str_loose("ad_hoc"), None);
    }
}
