//! Provider gateway for ideaforge
//!
//! Every AI provider implements [`LlmBackend`]. The variant to construct is
//! selected by the tagged [`ProviderKind`], so adding a provider touches only
//! this crate and never the stage logic. [`ProviderGateway`] is the single
//! entry point the pipeline uses: it checks the provider is active, obtains a
//! backend, and bounds the one network call with the caller's timeout.

mod anthropic_backend;
pub(crate) mod http_client;
mod openai_backend;
mod scripted_backend;
mod types;

pub use ideaforge_config::{ProviderConfig, ProviderKind};
pub use ideaforge_utils::error::LlmError;
pub use scripted_backend::ScriptedBackend;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

use anthropic_backend::AnthropicBackend;
use openai_backend::OpenAiBackend;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// HTTP request parameters shared by HTTP backends
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Resolve model and parameters for one invocation.
///
/// Precedence:
/// 1. `inv.model` overrides the backend default model
/// 2. `inv.metadata["max_tokens"]` / `["temperature"]` override defaults
pub(crate) fn resolve_params(
    default_model: &str,
    defaults: &HttpParams,
    inv: &LlmInvocation,
) -> (String, HttpParams) {
    let model = if inv.model.is_empty() {
        default_model.to_string()
    } else {
        inv.model.clone()
    };

    let max_tokens = inv
        .metadata
        .get("max_tokens")
        .and_then(|v| v.as_u64())
        .map(|v| v.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(defaults.max_tokens);

    let temperature = inv
        .metadata
        .get("temperature")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .unwrap_or(defaults.temperature);

    (
        model,
        HttpParams {
            max_tokens,
            temperature,
        },
    )
}

/// Construct a backend for a provider table entry.
///
/// # Errors
///
/// - `LlmError::ProviderAuth` if the provider's API key variable is unset
/// - `LlmError::Misconfiguration` if provider settings are incomplete
pub fn backend_for_provider(provider: &ProviderConfig) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider.kind {
        ProviderKind::Anthropic => Ok(Box::new(AnthropicBackend::new_from_config(provider)?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiBackend::new_from_config(provider)?)),
    }
}

/// Source of backends for the gateway
pub trait BackendFactory: Send + Sync {
    fn backend_for(&self, provider: &ProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError>;
}

/// Builds real HTTP backends on first use and caches them per provider name
#[derive(Default)]
pub struct HttpBackendFactory {
    cache: Mutex<HashMap<String, Arc<dyn LlmBackend>>>,
}

impl HttpBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendFactory for HttpBackendFactory {
    fn backend_for(&self, provider: &ProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(backend) = cache.get(&provider.name) {
            return Ok(Arc::clone(backend));
        }
        let backend: Arc<dyn LlmBackend> = Arc::from(backend_for_provider(provider)?);
        cache.insert(provider.name.clone(), Arc::clone(&backend));
        Ok(backend)
    }
}

/// Hands out one fixed backend regardless of provider (dry runs, tests)
pub struct StaticBackendFactory {
    backend: Arc<dyn LlmBackend>,
}

impl StaticBackendFactory {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

impl BackendFactory for StaticBackendFactory {
    fn backend_for(&self, _provider: &ProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
        Ok(Arc::clone(&self.backend))
    }
}

/// The pipeline's single door to AI providers
#[derive(Clone)]
pub struct ProviderGateway {
    factory: Arc<dyn BackendFactory>,
}

impl ProviderGateway {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self { factory }
    }

    /// Gateway over real HTTP backends
    pub fn http() -> Self {
        Self::new(Arc::new(HttpBackendFactory::new()))
    }

    /// Gateway that routes every provider to `backend`
    pub fn with_backend(backend: Arc<dyn LlmBackend>) -> Self {
        Self::new(Arc::new(StaticBackendFactory::new(backend)))
    }

    /// Perform exactly one provider call bounded by `inv.timeout`.
    ///
    /// The provider's configured model is used unless the invocation already
    /// names one. No retry is attempted on any failure.
    pub async fn invoke(
        &self,
        provider: &ProviderConfig,
        mut inv: LlmInvocation,
    ) -> Result<LlmResult, LlmError> {
        if !provider.active {
            return Err(LlmError::Misconfiguration(format!(
                "Provider '{}' is not active",
                provider.name
            )));
        }

        let backend = self.factory.backend_for(provider)?;
        if inv.model.is_empty() {
            inv.model = provider.model.clone();
        }

        let timeout = inv.timeout;
        let purpose = inv.purpose.clone();
        debug!(
            provider = %provider.name,
            purpose = %purpose,
            timeout_secs = timeout.as_secs(),
            "Dispatching provider call"
        );

        match tokio::time::timeout(timeout, backend.invoke(inv)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = %provider.name,
                    purpose = %purpose,
                    timeout_secs = timeout.as_secs(),
                    "Provider call timed out"
                );
                Err(LlmError::Timeout { duration: timeout })
            }
        }
    }
}
