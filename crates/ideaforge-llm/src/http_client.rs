//! Shared HTTP client infrastructure for HTTP-based providers
//!
//! One `reqwest::Client` is configured per backend with connection reuse and
//! rustls. Each invocation performs exactly one request; retrying is left to
//! the caller's policy.

use ideaforge_utils::redaction::redact_secrets;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::LlmError;

/// Default maximum HTTP timeout (10 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(600);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout: DEFAULT_MAX_HTTP_TIMEOUT,
        })
    }

    /// Start a POST request on the shared client
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Execute a single HTTP request bounded by `request_timeout`
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::ProviderQuota` for 429
    /// - `LlmError::ProviderOutage` for 5xx
    /// - `LlmError::Transport` for other 4xx and connection failures
    /// - `LlmError::Timeout` when the request exceeds its timeout
    pub async fn execute(
        &self,
        request_builder: RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build request: {}", e)))?;

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    Ok(response)
                } else {
                    Err(map_status(status, provider_name))
                }
            }
            Err(e) if e.is_timeout() => Err(LlmError::Timeout {
                duration: effective_timeout,
            }),
            Err(e) => Err(LlmError::Transport(format!(
                "{} request failed: {}",
                provider_name,
                redact_secrets(&e.to_string())
            ))),
        }
    }
}

/// Map a non-success HTTP status to an `LlmError`
pub(crate) fn map_status(status: StatusCode, provider_name: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {}",
            provider_name, status
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("{} rate limit exceeded: {}", provider_name, status))
        }
        s if s.is_server_error() => LlmError::ProviderOutage(format!(
            "{} returned server error: {}",
            provider_name, status
        )),
        _ => LlmError::Transport(format!(
            "{} returned client error: {}",
            provider_name, status
        )),
    }
}

/// Read the API key from `env_var`; a missing or empty key is an auth failure
pub(crate) fn api_key_from_env(env_var: &str, provider_name: &str) -> Result<String, LlmError> {
    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(LlmError::ProviderAuth(format!(
            "{provider_name} API key not found in environment variable '{env_var}'. \
             Set this variable or configure a different api_key_env in [providers.{provider_name}]."
        ))),
    }
}
