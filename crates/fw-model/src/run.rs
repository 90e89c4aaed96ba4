// Event data model (§3): AgentRun and its owned children.
//
// Composition is one-way: an `AgentRun` owns `Vec<AgentStep>` etc.; children
// reference the parent only by `RunId`, never by an owned back-pointer —
// the source this was distilled from builds bidirectional ORM links, which
// has no equivalent in an owned-tree model.

use crate::enums::{DecisionType, SignalType};
use crate::ids::{DecisionId, FailureId, RunId, SignalId, StepId};
use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Plan,
    Retrieve,
    Tool,
    Respond,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Tool,
    Model,
    Retrieval,
    Orchestration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_id: StepId,
    pub seq: u32,
    pub step_type: StepType,
    pub name: String,
    pub latency_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFailure {
    pub failure_id: FailureId,
    pub step_id: Option<StepId>,
    pub failure_type: FailureType,
    pub failure_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDecision {
    pub decision_id: DecisionId,
    pub step_id: Option<StepId>,
    pub decision_type: DecisionType,
    pub selected: String,
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentQualitySignal {
    pub signal_id: SignalId,
    pub step_id: Option<StepId>,
    pub signal_type: SignalType,
    pub signal_code: String,
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A complete agent run as submitted to ingest: the run plus every child
/// record, all created together in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub run_id: RunId,
    pub agent_id: String,
    pub agent_version: String,
    pub environment: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub steps: Vec<AgentStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AgentFailure>,
    #[serde(default)]
    pub decisions: Vec<AgentDecision>,
    #[serde(default)]
    pub quality_signals: Vec<AgentQualitySignal>,
}

impl AgentRun {
    /// `seq` values across `steps` must be exactly `0..N-1`, in any order.
    pub fn has_contiguous_step_sequence(&self) -> bool {
        let mut seqs: Vec<u32> = self.steps.iter().map(|s| s.seq).collect();
        seqs.sort_unstable();
        seqs.iter().enumerate().all(|(i, &seq)| i as u32 == seq)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        let ended_at = self.ended_at?;
        Some((ended_at - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(seq: u32) -> AgentStep {
        let now = Utc::now();
        AgentStep {
            step_id: StepId::new(),
            seq,
            step_type: StepType::Tool,
            name: "search".to_string(),
            latency_ms: 10,
            started_at: now,
            ended_at: now,
            metadata: Metadata::new(),
        }
    }

    fn run_with_steps(seqs: &[u32]) -> AgentRun {
        AgentRun {
            run_id: RunId::new(),
            agent_id: "agent-1".to_string(),
            agent_version: "1.0.0".to_string(),
            environment: "prod".to_string(),
            status: RunStatus::Success,
            started_at: Utc::now(),
            ended_at: None,
            created_at: Utc::now(),
            steps: seqs.iter().map(|&s| step(s)).collect(),
            failure: None,
            decisions: vec![],
            quality_signals: vec![],
        }
    }

    #[test]
    fn contiguous_sequence_accepted() {
        assert!(run_with_steps(&[0, 1, 2]).has_contiguous_step_sequence());
    }

    #[test]
    fn gap_in_sequence_rejected() {
        assert!(!run_with_steps(&[0, 2, 3]).has_contiguous_step_sequence());
    }

    #[test]
    fn empty_step_list_accepted() {
        assert!(run_with_steps(&[]).has_contiguous_step_sequence());
    }

    #[test]
    fn out_of_order_but_contiguous_accepted() {
        assert!(run_with_steps(&[2, 0, 1]).has_contiguous_step_sequence());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
