// Closed vocabularies for decision/signal tagging (component G).
//
// Every `decision_type` has its own closed set of legal `reason_code`s, and
// every `signal_type` has its own closed set of legal `signal_code`s.
// Unknown tags are rejected at the boundary, never silently grouped into
// an "other" bucket — that would make drift comparisons meaningless.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    ToolSelection,
    RetrievalStrategy,
    ResponseMode,
    RetryStrategy,
    OrchestrationPath,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::ToolSelection => "tool_selection",
            DecisionType::RetrievalStrategy => "retrieval_strategy",
            DecisionType::ResponseMode => "response_mode",
            DecisionType::RetryStrategy => "retry_strategy",
            DecisionType::OrchestrationPath => "orchestration_path",
        }
    }

    /// The closed set of reason codes legal for this decision type.
    pub fn reason_codes(&self) -> &'static [&'static str] {
        match self {
            DecisionType::ToolSelection => &[
                "fresh_data_required",
                "cached_data_sufficient",
                "tool_unavailable",
                "cost_optimization",
                "latency_optimization",
                "accuracy_required",
            ],
            DecisionType::RetrievalStrategy => &[
                "semantic_search_preferred",
                "keyword_match_sufficient",
                "hybrid_approach_needed",
                "filter_applied",
                "rerank_required",
            ],
            DecisionType::ResponseMode => &[
                "streaming_requested",
                "batch_preferred",
                "format_constraint",
                "length_constraint",
            ],
            DecisionType::RetryStrategy => &[
                "transient_error_detected",
                "rate_limit_encountered",
                "no_retry_terminal_error",
                "retry_budget_exhausted",
                "backoff_required",
            ],
            DecisionType::OrchestrationPath => &[
                "sequential_required",
                "parallel_preferred",
                "conditional_branch",
                "early_exit",
                "fallback_path",
            ],
        }
    }

    pub fn is_valid_reason_code(&self, reason_code: &str) -> bool {
        self.reason_codes().contains(&reason_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    SchemaValid,
    EmptyRetrieval,
    ToolSuccess,
    ToolFailure,
    RetryOccurred,
    LatencyThreshold,
    TokenUsage,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::SchemaValid => "schema_valid",
            SignalType::EmptyRetrieval => "empty_retrieval",
            SignalType::ToolSuccess => "tool_success",
            SignalType::ToolFailure => "tool_failure",
            SignalType::RetryOccurred => "retry_occurred",
            SignalType::LatencyThreshold => "latency_threshold",
            SignalType::TokenUsage => "token_usage",
        }
    }

    /// The closed set of signal codes legal for this signal type.
    pub fn signal_codes(&self) -> &'static [&'static str] {
        match self {
            SignalType::SchemaValid => &[
                "full_match",
                "partial_match",
                "validation_failed",
                "no_schema_defined",
            ],
            SignalType::EmptyRetrieval => &["no_results", "filtered_out", "index_empty"],
            SignalType::ToolSuccess => &["first_attempt", "after_retry", "fallback_used"],
            SignalType::ToolFailure => &[
                "timeout",
                "invalid_input",
                "unavailable",
                "rate_limited",
                "authentication_failed",
            ],
            SignalType::RetryOccurred => {
                &["single_retry", "multiple_retries", "max_retries_reached"]
            }
            SignalType::LatencyThreshold => {
                &["under_threshold", "exceeded_threshold", "significantly_exceeded"]
            }
            SignalType::TokenUsage => &[
                "low_usage",
                "moderate_usage",
                "high_usage",
                "limit_approached",
            ],
        }
    }

    pub fn is_valid_signal_code(&self, signal_code: &str) -> bool {
        self.signal_codes().contains(&signal_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_type_serializes_snake_case() {
        let json = serde_json::to_string(&DecisionType::ToolSelection).unwrap();
        assert_eq!(json, "\"tool_selection\"");
    }

    #[test]
    fn signal_type_serializes_snake_case() {
        let json = serde_json::to_string(&SignalType::EmptyRetrieval).unwrap();
        assert_eq!(json, "\"empty_retrieval\"");
    }

    #[test]
    fn tool_selection_reason_codes_are_closed() {
        let dt = DecisionType::ToolSelection;
        assert!(dt.is_valid_reason_code("cost_optimization"));
        assert!(!dt.is_valid_reason_code("made_up_reason"));
    }

    #[test]
    fn empty_retrieval_signal_codes_are_closed() {
        let st = SignalType::EmptyRetrieval;
        assert!(st.is_valid_signal_code("no_results"));
        assert!(!st.is_valid_signal_code("no_results_found_anywhere"));
    }

    #[test]
    fn every_decision_type_has_nonempty_reason_codes() {
        for dt in [
            DecisionType::ToolSelection,
            DecisionType::RetrievalStrategy,
            DecisionType::ResponseMode,
            DecisionType::RetryStrategy,
            DecisionType::OrchestrationPath,
        ] {
            assert!(!dt.reason_codes().is_empty());
        }
    }
}
