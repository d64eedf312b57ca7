use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::TechStackCatalog;

/// Default per-call provider timeout in seconds
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

/// Smallest accepted per-call provider timeout in seconds
pub const MIN_STAGE_TIMEOUT_SECS: u64 = 5;

/// Default max output tokens for a provider
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Provider used when neither the project nor the config names one
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// One configured AI provider. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub display_name: String,
    pub kind: ProviderKind,
    pub model: String,
    pub max_tokens: u32,
    pub active: bool,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub temperature: f32,
}

impl ProviderConfig {
    /// Built-in settings for a provider kind
    pub fn builtin(name: &str, kind: ProviderKind) -> Self {
        let (display_name, model) = match kind {
            ProviderKind::Anthropic => ("Anthropic Claude", "claude-sonnet-4-5"),
            ProviderKind::OpenAi => ("OpenAI GPT", "gpt-4o"),
        };
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            active: true,
            api_key_env: kind.default_api_key_env().to_string(),
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// `[providers.<name>]` table as written in config.toml; every key optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderOverrides {
    pub kind: Option<ProviderKind>,
    pub display_name: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub active: Option<bool>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl ProviderOverrides {
    /// Layer these overrides on top of `base`
    pub fn apply_to(&self, base: &mut ProviderConfig) {
        if let Some(kind) = self.kind {
            if kind != base.kind {
                base.api_key_env = kind.default_api_key_env().to_string();
            }
            base.kind = kind;
        }
        if let Some(display_name) = &self.display_name {
            base.display_name = display_name.clone();
        }
        if let Some(model) = &self.model {
            base.model = model.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            base.max_tokens = max_tokens;
        }
        if let Some(active) = self.active {
            base.active = active;
        }
        if let Some(api_key_env) = &self.api_key_env {
            base.api_key_env = api_key_env.clone();
        }
        if let Some(base_url) = &self.base_url {
            base.base_url = Some(base_url.clone());
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
    }
}

/// `[defaults]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    pub provider: String,
    pub stage_timeout_secs: u64,
    pub output_dir: Utf8PathBuf,
    pub store_path: Utf8PathBuf,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            output_dir: Utf8PathBuf::from("projects"),
            store_path: Utf8PathBuf::from(".ideaforge/projects.json"),
        }
    }
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Cli,
    ConfigFile(Utf8PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::ConfigFile(path) => write!(f, "config ({path})"),
            Self::Defaults => write!(f, "default"),
        }
    }
}

/// CLI-provided overrides, applied last
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub provider: Option<String>,
    pub stage_timeout_secs: Option<u64>,
    pub output_dir: Option<Utf8PathBuf>,
    pub store_path: Option<Utf8PathBuf>,
}

/// Resolved ideaforge configuration.
///
/// Precedence: CLI arguments > config file > built-in defaults. Build one
/// with [`Config::discover`] (CLI behaviour) or [`Config::builtin`]
/// (deterministic, ignores the filesystem). Once built it is never mutated;
/// the catalog is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub catalog: Arc<TechStackCatalog>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Configuration made only of built-in defaults
    pub fn builtin() -> Result<Self, ideaforge_utils::error::ConfigError> {
        let mut source_attribution = HashMap::new();
        for key in ["provider", "stage_timeout_secs", "output_dir", "store_path", "catalog"] {
            source_attribution.insert(key.to_string(), ConfigSource::Defaults);
        }
        Ok(Self {
            defaults: Defaults::default(),
            providers: builtin_providers(),
            catalog: Arc::new(TechStackCatalog::builtin()?),
            source_attribution,
        })
    }

    /// Look up a configured provider by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Provider for a project: its own selection if set, otherwise the default
    pub fn provider_for(&self, selected: Option<&str>) -> Option<&ProviderConfig> {
        let name = selected
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.defaults.provider);
        self.provider(name)
    }

    /// Per-call provider timeout
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.stage_timeout_secs.max(MIN_STAGE_TIMEOUT_SECS))
    }

    /// Effective configuration as `key -> (value, source)` pairs
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let source = |key: &str| {
            self.source_attribution
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| ConfigSource::Defaults.to_string())
        };

        let mut out = BTreeMap::new();
        out.insert(
            "provider".to_string(),
            (self.defaults.provider.clone(), source("provider")),
        );
        out.insert(
            "stage_timeout_secs".to_string(),
            (
                self.defaults.stage_timeout_secs.to_string(),
                source("stage_timeout_secs"),
            ),
        );
        out.insert(
            "output_dir".to_string(),
            (self.defaults.output_dir.to_string(), source("output_dir")),
        );
        out.insert(
            "store_path".to_string(),
            (self.defaults.store_path.to_string(), source("store_path")),
        );
        out
    }
}

/// Providers known without any configuration file
pub fn builtin_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "anthropic".to_string(),
        ProviderConfig::builtin("anthropic", ProviderKind::Anthropic),
    );
    providers.insert(
        "openai".to_string(),
        ProviderConfig::builtin("openai", ProviderKind::OpenAi),
    );
    providers
}
