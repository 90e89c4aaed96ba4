// Privacy rules shared by every entity that accepts free-form metadata or
// operator-supplied text (step/decision/signal metadata, failure messages,
// baseline descriptions).
//
// The platform never stores prompt/response text. Metadata is kept as a
// map of primitive scalars with a key blocklist and a value-length limit;
// no recursive structures, no arrays, no deep objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata keys that are never allowed, regardless of case, because they
/// are content-bearing (likely to hold prompt/response text).
pub const FORBIDDEN_METADATA_KEYS: &[&str] = &[
    "prompt",
    "response",
    "reasoning",
    "thought",
    "message",
    "content",
    "text",
    "output",
    "input",
    "chain_of_thought",
    "explanation",
    "rationale",
];

/// Substrings that must never appear in a failure message, regardless of
/// case — these indicate a credential leaked into a diagnostic string.
pub const FORBIDDEN_MESSAGE_SUBSTRINGS: &[&str] = &["password", "api_key", "token", "secret"];

pub const MAX_METADATA_STRING_LEN: usize = 100;
pub const MAX_BASELINE_DESCRIPTION_LEN: usize = 200;

/// A primitive scalar metadata value. Deliberately excludes arrays and
/// nested objects — `serde(untagged)` tries each variant in order and
/// accepts the first that matches the JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Error, PartialEq)]
pub enum PrivacyError {
    #[error("metadata key '{key}' is forbidden (content-bearing)")]
    ForbiddenKey { key: String },
    #[error("metadata value for '{key}' exceeds {max} characters")]
    StringTooLong { key: String, max: usize },
    #[error("failure message contains a forbidden substring")]
    ForbiddenMessageSubstring,
    #[error("description exceeds {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("description contains forbidden content-bearing keyword '{keyword}'")]
    DescriptionForbiddenKeyword { keyword: String },
}

/// Validate a metadata map against the key blocklist and string-length limit.
pub fn validate_metadata(metadata: &Metadata) -> Result<(), PrivacyError> {
    for (key, value) in metadata {
        let lower = key.to_ascii_lowercase();
        if FORBIDDEN_METADATA_KEYS.contains(&lower.as_str()) {
            return Err(PrivacyError::ForbiddenKey { key: key.clone() });
        }
        if let MetadataValue::String(s) = value {
            if s.chars().count() > MAX_METADATA_STRING_LEN {
                return Err(PrivacyError::StringTooLong {
                    key: key.clone(),
                    max: MAX_METADATA_STRING_LEN,
                });
            }
        }
    }
    Ok(())
}

/// Validate a failure message against the credential-keyword blocklist.
pub fn validate_failure_message(message: &str) -> Result<(), PrivacyError> {
    let lower = message.to_ascii_lowercase();
    if FORBIDDEN_MESSAGE_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return Err(PrivacyError::ForbiddenMessageSubstring);
    }
    Ok(())
}

/// Validate a baseline description: length bound plus the same
/// content-bearing keyword blocklist used for metadata keys, scanned as
/// substrings since a description is free text rather than a key/value map.
pub fn validate_description(description: &str) -> Result<(), PrivacyError> {
    if description.chars().count() > MAX_BASELINE_DESCRIPTION_LEN {
        return Err(PrivacyError::DescriptionTooLong {
            max: MAX_BASELINE_DESCRIPTION_LEN,
        });
    }
    let lower = description.to_ascii_lowercase();
    for keyword in FORBIDDEN_METADATA_KEYS {
        if lower.contains(keyword) {
            return Err(PrivacyError::DescriptionForbiddenKeyword {
                keyword: keyword.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn rejects_forbidden_key_any_case() {
        let m = meta(&[("Prompt", MetadataValue::String("hi".into()))]);
        assert_eq!(
            validate_metadata(&m),
            Err(PrivacyError::ForbiddenKey {
                key: "Prompt".to_string()
            })
        );
    }

    #[test]
    fn accepts_benign_scalar_metadata() {
        let m = meta(&[
            ("tool_name", MetadataValue::String("search".into())),
            ("retry_count", MetadataValue::Int(2)),
            ("confidence", MetadataValue::Float(0.9)),
            ("cached", MetadataValue::Bool(false)),
        ]);
        assert!(validate_metadata(&m).is_ok());
    }

    #[test]
    fn string_length_boundary_100_ok_101_rejected() {
        let ok = meta(&[("k", MetadataValue::String("a".repeat(100)))]);
        assert!(validate_metadata(&ok).is_ok());

        let too_long = meta(&[("k", MetadataValue::String("a".repeat(101)))]);
        assert!(validate_metadata(&too_long).is_err());
    }

    #[test]
    fn failure_message_rejects_credential_keywords_any_case() {
        assert!(validate_failure_message("Invalid API_KEY supplied").is_err());
        assert!(validate_failure_message("connection reset by peer").is_ok());
    }

    #[test]
    fn description_rejects_forbidden_keyword_and_overlength() {
        assert!(validate_description("baseline after prompt tuning rollout").is_err());
        assert!(validate_description(&"x".repeat(201)).is_err());
        assert!(validate_description("pre-release baseline for v2 tool routing").is_ok());
    }
}
