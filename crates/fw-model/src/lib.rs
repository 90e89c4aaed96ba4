//! Data model for the agent-behavior observability platform: runs and
//! their events, behavior profiles, baselines, and drift findings.
//!
//! This crate holds types and the validation rules that apply to them; it
//! has no storage or I/O dependency, so every other crate in the workspace
//! depends on it.

pub mod baseline;
pub mod drift;
pub mod enums;
pub mod ids;
pub mod metadata;
pub mod profile;
pub mod run;

pub use baseline::{BaselineKey, BaselineType, BehaviorBaseline};
pub use drift::{BehaviorDrift, DriftSeverity, DriftType, TestMethod};
pub use enums::{DecisionType, SignalType};
pub use ids::{BaselineId, DecisionId, DriftId, FailureId, ProfileId, RunId, SignalId, StepId};
pub use metadata::{Metadata, MetadataValue, PrivacyError};
pub use profile::{BehaviorProfile, Distribution, LatencyStats};
pub use run::{
    AgentDecision, AgentFailure, AgentQualitySignal, AgentRun, AgentStep, FailureType, RunStatus,
    StepType,
};
