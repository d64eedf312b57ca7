//! Core types for the provider gateway

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One request to a provider
///
/// `purpose` names what the call produces (a stage name such as
/// `"architecture"`, or `"file:"` plus a generated path such as `"file:backend/server.js"`)
/// and is used for logging and by scripted backends to pick a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmInvocation {
    pub project_id: String,
    pub purpose: String,
    /// Model override; empty means the backend default
    pub model: String,
    /// Upper bound for this single call
    pub timeout: Duration,
    pub messages: Vec<Message>,
    /// Per-call parameter overrides (`max_tokens`, `temperature`)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        purpose: impl Into<String>,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            purpose: purpose.into(),
            model: String::new(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Concatenated text of all user messages
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Raw provider reply plus accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    pub raw_response: String,
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// Uniform capability over every provider: one call in, one reply out
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Perform exactly one provider call. Implementations never retry.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builders() {
        let inv = LlmInvocation::new(
            "7",
            "architecture",
            Duration::from_secs(60),
            vec![Message::system("be brief"), Message::user("a"), Message::user("b")],
        )
        .with_model("gpt-4o")
        .with_metadata("max_tokens", serde_json::json!(512));

        assert_eq!(inv.model, "gpt-4o");
        assert_eq!(inv.metadata["max_tokens"], serde_json::json!(512));
        assert_eq!(inv.user_text(), "a\n\nb");
    }

    #[test]
    fn test_result_tokens() {
        let result = LlmResult::new("hi", "anthropic", "claude").with_tokens(10, 2);
        assert_eq!(result.tokens_input, Some(10));
        assert_eq!(result.tokens_output, Some(2));
    }
}
