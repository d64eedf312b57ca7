//! Output validation for stage responses
//!
//! Raw provider text is turned into artifacts here. Each validator either
//! returns the canonical artifact or a [`ValidationError`] that maps onto
//! `ProviderMalformedResponse` with a human-readable guidance string.

mod canonical;
mod document;
mod requirements;

pub use canonical::{canonicalize, extract_code};
pub use document::{DocumentRules, validate_document};
pub use requirements::{RequirementsAnalysis, UserStory, extract_json_object, validate_requirements};

use ideaforge_utils::error::{MalformedKind, PipelineError};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Prefix of the insufficient-input message shown to users
pub const INSUFFICIENT_PREFIX: &str =
    "Requirements are insufficient for analysis. Please provide detailed requirements including:";

/// Guidance for a requirements reply that could not be mapped
pub const UNPARSABLE_GUIDANCE: &str = "The requirements analysis could not be read from the provider response. \
Run the requirements stage again. If the problem persists, try a different provider.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{prefix}\n{guidance}", prefix = INSUFFICIENT_PREFIX)]
    InsufficientInput { guidance: String },

    #[error("{guidance} ({reason})", guidance = UNPARSABLE_GUIDANCE)]
    Unparsable { reason: String },

    #[error("The {document} response was empty")]
    Empty { document: &'static str },

    #[error("The response declined the task (starts with '{pattern}')")]
    Refusal { pattern: String },

    #[error("The response describes the document instead of containing it (matched '{pattern}')")]
    MetaSummaryDetected { pattern: String },

    #[error("The {document} response is too short: {actual} lines, at least {minimum} required")]
    TooShort {
        document: &'static str,
        actual: usize,
        minimum: usize,
    },
}

impl ValidationError {
    pub fn kind(&self) -> MalformedKind {
        match self {
            Self::InsufficientInput { .. } => MalformedKind::InsufficientInput,
            _ => MalformedKind::UnparsableOutput,
        }
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::ProviderMalformedResponse {
            kind: err.kind(),
            guidance: err.to_string(),
        }
    }
}

static SELECTED_STACK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""selectedStackId"\s*:\s*"([^"]*)""#).unwrap());

/// Read `selectedStackId` from a stack-selection reply.
///
/// Falls back to a pattern search when the surrounding JSON is broken.
/// Returns `None` when no non-empty id can be found.
pub fn parse_selected_stack_id(raw: &str) -> Option<String> {
    let from_json = extract_json_object(raw)
        .and_then(|json| serde_json::from_str::<serde_json::Value>(json).ok())
        .and_then(|value| {
            value
                .get("selectedStackId")
                .and_then(|id| id.as_str())
                .map(str::to_string)
        });

    from_json
        .or_else(|| {
            SELECTED_STACK_ID
                .captures(raw)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pipeline_error_conversion_keeps_guidance() {
        let err: PipelineError = ValidationError::InsufficientInput {
            guidance: "Who are the users?".into(),
        }
        .into();
        match err {
            PipelineError::ProviderMalformedResponse { kind, guidance } => {
                assert_eq!(kind, MalformedKind::InsufficientInput);
                assert!(guidance.ends_with("including:\nWho are the users?"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_selected_stack_id() {
        assert_eq!(
            parse_selected_stack_id(r#"{"selectedStackId": "react_express"}"#).as_deref(),
            Some("react_express")
        );
        assert_eq!(
            parse_selected_stack_id("I pick:\n```json\n{\"selectedStackId\": \"vue_fastapi\", \"reason\": \"fits\"}\n```").as_deref(),
            Some("vue_fastapi")
        );
        // Trailing comma breaks the JSON but the id is still recoverable
        assert_eq!(
            parse_selected_stack_id(r#"{"selectedStackId": "nextjs", }"#).as_deref(),
            Some("nextjs")
        );
        assert_eq!(parse_selected_stack_id("React with Express"), None);
        assert_eq!(parse_selected_stack_id(r#"{"selectedStackId": ""}"#), None);
        assert_eq!(parse_selected_stack_id(r#"{"selectedStackId": 7}"#), None);
    }

    proptest! {
        #[test]
        fn prop_canonicalize_normalizes_whitespace(text in "[a-z#` \\n\\r\\t]{0,80}") {
            let out = canonicalize(&text);
            prop_assert!(!out.contains('\r'));
            prop_assert!(!out.contains("\n\n\n"));
            prop_assert!(!out.starts_with('\n'));
            prop_assert!(!out.ends_with('\n'));
            for line in out.lines() {
                prop_assert_eq!(line, line.trim_end());
            }
        }

        #[test]
        fn prop_extract_json_object_is_brace_delimited(text in ".{0,60}") {
            if let Some(slice) = extract_json_object(&text) {
                prop_assert!(slice.starts_with('{'), "slice must start with '{{'");
                prop_assert!(slice.ends_with('}'), "slice must end with '}}'");
            }
        }
    }
}
