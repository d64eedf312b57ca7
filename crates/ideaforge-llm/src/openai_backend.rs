//! OpenAI-compatible HTTP backend
//!
//! Speaks the chat-completions protocol, so it also serves gateways and
//! self-hosted servers that expose the same API (set `base_url`).

use async_trait::async_trait;
use ideaforge_config::ProviderConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::HttpParams;
use crate::LlmError;
use crate::http_client::{HttpClient, api_key_from_env};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

/// Default OpenAI chat completions endpoint
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub(crate) struct OpenAiBackend {
    client: HttpClient,
    provider_name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl OpenAiBackend {
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

    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` if the API key variable is unset
    /// - `LlmError::Misconfiguration` if no model is configured
    pub fn new_from_config(provider: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = api_key_from_env(&provider.api_key_env, &provider.name)?;

        if provider.model.trim().is_empty() {
            return Err(LlmError::Misconfiguration(format!(
                "Model not specified for provider '{}'. \
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

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) =
            crate::resolve_params(&self.default_model, &self.default_params, &inv);

        debug!(
            provider = %self.provider_name,
            project_id = %inv.project_id,
            purpose = %inv.purpose,
            model = %model,
            max_tokens = params.max_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking OpenAI-compatible backend"
        );

        let request_body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body);

        let response = self
            .client
            .execute(request, inv.timeout, &self.provider_name)
            .await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!(
                "Failed to parse {} response: {}",
                self.provider_name, e
            ))
        })?;

        let content = first_choice_content(&response_body).ok_or_else(|| {
            LlmError::MalformedResponse(format!(
                "{} response missing content in choices[0]",
                self.provider_name
            ))
        })?;

        let mut result = LlmResult::new(content, self.provider_name.clone(), model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = %self.provider_name,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "OpenAI-compatible invocation completed"
        );

        Ok(result)
    }
}

fn first_choice_content(response: &ChatResponse) -> Option<String> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .filter(|c| !c.trim().is_empty())
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
