use std::fmt;
use std::time::Duration;
use thiserror::Error;
pub use ideaforge_lock::LockError;

use crate::exit_codes::ExitCode;

/// Pipeline-level error type returned by stage and generation operations.
///
/// Every variant maps onto one entry of the failure taxonomy that callers
/// see in a failure envelope:
///
/// | Variant | Surfaced | Retryable |
/// |---------|----------|-----------|
/// | `StagePrerequisiteNotMet` | yes | no |
/// | `StageActionInProgress` | yes | yes |
/// | `ProviderAuthError` | yes | no |
/// | `ProviderRateLimited` | yes | yes |
/// | `ProviderTimeout` | yes | yes |
/// | `ProviderMalformedResponse` | yes | no |
/// | `NetworkError` | yes | yes |
/// | `UnknownStackId` | no (recovered by fallback) | no |
/// | `DestinationUnwritable` | generation only | no |
///
/// Prerequisite and in-progress errors are always raised before any provider
/// call is made, so they never coincide with a partial write.
#[derive(Error, Debug, strum::IntoStaticStr)]
pub enum PipelineError {
    #[error("Stage '{stage}' cannot run yet: {missing} is empty")]
    StagePrerequisiteNotMet { stage: String, missing: String },

    #[error("A stage action is already in progress for project '{project_id}' ({action})")]
    StageActionInProgress { project_id: String, action: String },

    #[error("Provider authentication failed: {0}")]
    ProviderAuthError(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimited(String),

    #[error("Provider call timed out after {}s", duration.as_secs())]
    ProviderTimeout { duration: Duration },

    #[error("{guidance}")]
    ProviderMalformedResponse {
        kind: MalformedKind,
        guidance: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unknown tech stack '{stack_id}' for application type '{application_type}'")]
    UnknownStackId {
        application_type: String,
        stack_id: String,
    },

    #[error("Destination {path} is not writable: {reason}")]
    DestinationUnwritable { path: String, reason: String },

    #[error("Project '{id}' not found")]
    ProjectNotFound { id: String },

    #[error("Artifact store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Why a provider response failed structural validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedKind {
    /// The model explicitly asked for more detail in the input
    InsufficientInput,
    /// The model replied with content that could not be mapped to the expected shape
    UnparsableOutput,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientInput => write!(f, "insufficient input"),
            Self::UnparsableOutput => write!(f, "unparsable output"),
        }
    }
}

impl PipelineError {
    /// Stable taxonomy name of this error (e.g. `"ProviderTimeout"`)
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether a caller may reasonably retry the same request unchanged
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::StageActionInProgress { .. }
                | Self::ProviderRateLimited(_)
                | Self::ProviderTimeout { .. }
                | Self::NetworkError(_)
        )
    }

    /// Map this error to a CLI exit code
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::ProjectNotFound { .. } => ExitCode::CLI_ARGS,
            _ => ExitCode::STAGE_FAILED,
        }
    }

    /// Format the error for terminal output with context and suggestions
    pub fn display_for_user(&self) -> String {
        let mut out = format!("Error: {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n\n{context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n  - {suggestion}"));
            }
        }
        out
    }
}

impl From<LockError> for PipelineError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::ActionInProgress {
                project_id, action, ..
            } => Self::StageActionInProgress { project_id, action },
            LockError::InvalidProjectId { reason } => Self::Config(ConfigError::InvalidValue {
                key: "project_id".to_string(),
                value: reason,
            }),
            LockError::LockFile { path, reason } => {
                Self::Store(format!("cannot lock {path}: {reason}"))
            }
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Transport(msg) => Self::NetworkError(msg),
            LlmError::ProviderOutage(msg) => Self::NetworkError(msg),
            LlmError::ProviderAuth(msg) => Self::ProviderAuthError(msg),
            LlmError::ProviderQuota(msg) => Self::ProviderRateLimited(msg),
            LlmError::Timeout { duration } => Self::ProviderTimeout { duration },
            LlmError::MalformedResponse(msg) => Self::ProviderMalformedResponse {
                kind: MalformedKind::UnparsableOutput,
                guidance: msg,
            },
            LlmError::Misconfiguration(msg) | LlmError::Unsupported(msg) => {
                Self::Config(ConfigError::Provider(msg))
            }
        }
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    StageExecution,
    ProviderIntegration,
    FileSystem,
    Concurrency,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::StageExecution => write!(f, "Stage Execution"),
            Self::ProviderIntegration => write!(f, "Provider Integration"),
            Self::FileSystem => write!(f, "File System"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

impl UserFriendlyError for PipelineError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(config_err) => config_err.user_message(),
            Self::ProviderMalformedResponse { guidance, .. } => guidance.clone(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::StagePrerequisiteNotMet { .. } => Some(
                "Stages run in order: requirements, architecture, UX design, then project generation."
                    .to_string(),
            ),
            Self::StageActionInProgress { .. } => Some(
                "Only one stage action may run per project at a time.".to_string(),
            ),
            Self::ProviderAuthError(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderRateLimited(_) => Some(
                "The provider rejected the request because a rate or usage limit was reached."
                    .to_string(),
            ),
            Self::ProviderTimeout { .. } => Some(
                "The provider did not answer within the configured stage timeout. No artifact was changed."
                    .to_string(),
            ),
            Self::ProviderMalformedResponse { kind, .. } => Some(format!(
                "The provider response could not be used ({kind}). No artifact was changed."
            )),
            Self::NetworkError(_) => Some(
                "The provider could not be reached or reported a service outage.".to_string(),
            ),
            Self::UnknownStackId { .. } => Some(
                "The selected stack is not part of the catalog for this application type."
                    .to_string(),
            ),
            Self::DestinationUnwritable { .. } => Some(
                "Project generation needs a writable output directory.".to_string(),
            ),
            Self::ProjectNotFound { .. } | Self::Store(_) => None,
            Self::Config(config_err) => config_err.context(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::StagePrerequisiteNotMet { .. } => vec![
                "Run the earlier stages first, then retry this one".to_string(),
                "Check progress with 'ideaforge status <project-id>'".to_string(),
            ],
            Self::StageActionInProgress { .. } => {
                vec!["Wait for the running action to finish and try again".to_string()]
            }
            Self::ProviderAuthError(_) => vec![
                "Check that the API key environment variable for this provider is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderRateLimited(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Select a different provider for this project".to_string(),
            ],
            Self::ProviderTimeout { .. } => vec![
                "Increase stage_timeout_secs in .ideaforge/config.toml".to_string(),
                "Retry the stage".to_string(),
            ],
            Self::ProviderMalformedResponse {
                kind: MalformedKind::InsufficientInput,
                ..
            } => vec!["Add the details listed above to the project requirements".to_string()],
            Self::ProviderMalformedResponse { .. } => vec!["Retry the stage".to_string()],
            Self::NetworkError(_) => vec![
                "Check your network connection".to_string(),
                "Retry the stage".to_string(),
            ],
            Self::UnknownStackId { .. } => {
                vec!["List valid stacks with 'ideaforge catalog'".to_string()]
            }
            Self::DestinationUnwritable { .. } => vec![
                "Check permissions on the output directory".to_string(),
                "Pass a different directory with --out".to_string(),
            ],
            Self::ProjectNotFound { .. } => {
                vec!["Create the project first with 'ideaforge init'".to_string()]
            }
            Self::Store(_) => vec!["Check the store file path and its permissions".to_string()],
            Self::Config(config_err) => config_err.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::StagePrerequisiteNotMet { .. } => ErrorCategory::StageExecution,
            Self::StageActionInProgress { .. } => ErrorCategory::Concurrency,
            Self::ProviderAuthError(_) => ErrorCategory::Configuration,
            Self::ProviderRateLimited(_)
            | Self::ProviderTimeout { .. }
            | Self::NetworkError(_) => ErrorCategory::ProviderIntegration,
            Self::ProviderMalformedResponse { .. } | Self::UnknownStackId { .. } => {
                ErrorCategory::Validation
            }
            Self::DestinationUnwritable { .. } | Self::Store(_) => ErrorCategory::FileSystem,
            Self::ProjectNotFound { .. } => ErrorCategory::StageExecution,
            Self::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },

    #[error("Provider configuration error: {0}")]
    Provider(String),
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::ValidationFailed { errors, .. } => {
                format!("Configuration is invalid:\n  {}", errors.join("\n  "))
            }
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => Some(
                "ideaforge looks for .ideaforge/config.toml in the current directory and its parents."
                    .to_string(),
            ),
            Self::Provider(_) => Some(
                "Provider settings live under [providers.<name>] in the configuration file."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec!["Check the TOML syntax of the configuration file".to_string()],
            Self::NotFound { .. } => vec!["Pass an existing file with --config".to_string()],
            _ => vec!["Review .ideaforge/config.toml".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Provider answered but the body could not be decoded or was empty
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
