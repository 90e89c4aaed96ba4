use fw_model::PrivacyError;
use thiserror::Error;

/// Error kinds surfaced by the event store (§7). Distinct from the
/// drift-engine and baseline-manager error enums in their own crates —
/// each crate owns the kinds relevant to it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("step sequence is not 0..N-1")]
    SchemaInvalid,

    #[error("privacy violation: {0}")]
    PrivacyViolation(#[from] PrivacyError),

    #[error("run status is 'failure' but no failure record was supplied")]
    MissingFailure,

    #[error("reason_code '{reason_code}' is not recognized for decision_type '{decision_type}'")]
    InvalidReasonCode {
        decision_type: &'static str,
        reason_code: String,
    },

    #[error("signal_code '{signal_code}' is not recognized for signal_type '{signal_type}'")]
    InvalidSignalCode {
        signal_type: &'static str,
        signal_code: String,
    },

    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("malformed stored JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}
