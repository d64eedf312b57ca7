//! Anthropic HTTP backend
//!
//! Talks to the Anthropic Messages API. System prompts travel in the
//! top-level `system` field rather than the message list.

use async_trait::async_trait;
use ideaforge_config::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, api_key_from_env};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use crate::HttpParams;

/// Default Anthropic API endpoint
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: HttpClient,
    provider_name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        provider_name: String,
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            provider_name,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Build from a provider table entry, reading the key from its env var
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` if the API key variable is unset
    /// - `LlmError::Misconfiguration` if no model is configured
    pub fn new_from_config(provider: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = api_key_from_env(&provider.api_key_env, &provider.name)?;

        if provider.model.trim().is_empty() {
            return Err(LlmError::Misconfiguration(format!(
                "Anthropic model not specified for provider '{}'. \
                 Please set [providers.{}] model = \"model-name\".",
                provider.name, provider.name
            )));
        }

        Self::new(
            provider.name.clone(),
            api_key,
            provider.base_url.clone(),
            provider.model.clone(),
            HttpParams {
                max_tokens: provider.max_tokens,
                temperature: provider.temperature,
            },
        )
    }

    fn resolve_params(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        crate::resolve_params(&self.default_model, &self.default_params, inv)
    }

    /// Split system messages into the `system` field and keep the rest in order
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = system_prompt.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        system_prompt = Some(msg.content.clone());
                    }
                }
                Role::User => anthropic_messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                Role::Assistant => anthropic_messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, anthropic_messages)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = %self.provider_name,
            project_id = %inv.project_id,
            purpose = %inv.purpose,
            model = %model,
            max_tokens = params.max_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let (system_prompt, anthropic_messages) = Self::convert_messages(&inv.messages);

        let request_body = AnthropicRequest {
            model: model.clone(),
            messages: anthropic_messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: system_prompt,
        };

        let request = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body);

        let response = self
            .client
            .execute(request, inv.timeout, &self.provider_name)
            .await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let content = extract_text(&response_body);
        if content.trim().is_empty() {
            return Err(LlmError::MalformedResponse(
                "Anthropic response missing text content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, self.provider_name.clone(), model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }

        debug!(
            provider = %self.provider_name,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

/// Concatenate all text blocks of a response
fn extract_text(response: &AnthropicResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
