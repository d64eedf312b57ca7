//! Result envelopes returned by the orchestrator
//!
//! Operations never return `Err` to their caller. Success and failure both
//! travel in an envelope so the CLI (or any other surface) can print it as
//! JSON unchanged.

use serde::Serialize;

use ideaforge_status::StageKind;
use ideaforge_utils::error::{ErrorCategory, MalformedKind, PipelineError, UserFriendlyError};
use ideaforge_utils::redaction::redact_secrets;

use crate::codegen::GenerationManifest;

/// Serializable view of a [`PipelineError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    /// Taxonomy name, e.g. `ProviderTimeout`
    pub kind: String,
    pub message: String,
    pub retryable: bool,
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<MalformedKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl From<&PipelineError> for EnvelopeError {
    fn from(err: &PipelineError) -> Self {
        let malformed = match err {
            PipelineError::ProviderMalformedResponse { kind, .. } => Some(*kind),
            _ => None,
        };
        Self {
            kind: err.kind().to_string(),
            message: redact_secrets(&err.user_message()),
            retryable: err.retryable(),
            category: err.category(),
            malformed,
            suggestions: err.suggestions(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageEnvelope {
    pub success: bool,
    pub project_id: String,
    pub stage: StageKind,
    /// The stage's output artifact. For generation this is the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
}

impl StageEnvelope {
    pub(crate) fn ok(project_id: &str, stage: StageKind, artifact: String, status: &str) -> Self {
        Self {
            success: true,
            project_id: project_id.to_string(),
            stage,
            artifact: Some(artifact),
            status: Some(status.to_string()),
            error: None,
        }
    }

    pub(crate) fn failed(project_id: &str, stage: StageKind, err: &PipelineError) -> Self {
        Self {
            success: false,
            project_id: project_id.to_string(),
            stage,
            artifact: None,
            status: None,
            error: Some(err.into()),
        }
    }

    /// The underlying error kind, if the stage failed
    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationEnvelope {
    pub success: bool,
    pub project_id: String,
    /// Present on success, and on a failed run that got as far as writing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<GenerationManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
}

impl GenerationEnvelope {
    pub(crate) fn ok(project_id: &str, manifest: GenerationManifest, status: &str) -> Self {
        Self {
            success: true,
            project_id: project_id.to_string(),
            manifest: Some(manifest),
            status: Some(status.to_string()),
            error: None,
        }
    }

    pub(crate) fn failed(
        project_id: &str,
        err: &PipelineError,
        manifest: Option<GenerationManifest>,
    ) -> Self {
        Self {
            success: false,
            project_id: project_id.to_string(),
            manifest,
            status: None,
            error: Some(err.into()),
        }
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }

    /// Collapse into a stage envelope, carrying the project root as artifact
    pub fn into_stage_envelope(self) -> StageEnvelope {
        StageEnvelope {
            success: self.success,
            project_id: self.project_id,
            stage: StageKind::ProjectGeneration,
            artifact: self
                .manifest
                .filter(|_| self.success)
                .map(|m| m.root.to_string()),
            status: self.status,
            error: self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_envelope_error_from_timeout() {
        let err = PipelineError::ProviderTimeout {
            duration: Duration::from_secs(30),
        };
        let env = EnvelopeError::from(&err);
        assert_eq!(env.kind, "ProviderTimeout");
        assert!(env.retryable);
        assert!(env.malformed.is_none());
        assert!(env.message.contains("30s"));
        assert_eq!(env.category, err.category());
    }

    #[test]
    fn test_malformed_kind_is_exposed() {
        let err = PipelineError::ProviderMalformedResponse {
            kind: MalformedKind::InsufficientInput,
            guidance: "Who are the users?".into(),
        };
        let env = StageEnvelope::failed("3", StageKind::Requirements, &err);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["malformed"], "insufficient_input");
        assert_eq!(json["error"]["message"], "Who are the users?");
        assert_eq!(json["error"]["category"], "validation");
        assert!(json.get("artifact").is_none());
    }

    #[test]
    fn test_success_envelope_shape() {
        let env = StageEnvelope::ok("3", StageKind::UxDesign, "# UX".into(), "UX Design Complete");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["stage"], "ux_design");
        assert_eq!(json["artifact"], "# UX");
        assert!(json.get("error").is_none());
    }
}
