//! Configuration for ideaforge
//!
//! - [`Config`]: defaults, provider table and tech-stack catalog
//! - [`catalog`]: application categories and concrete stacks
//!
//! Configuration is loaded once per process and then shared read-only.

pub mod catalog;
mod discovery;
mod model;
mod validation;

pub use catalog::{ApplicationCategory, StackRecord, TechStackCatalog};
pub use discovery::{CONFIG_DIR, CONFIG_FILE};
pub use model::{
    CliArgs, Config, ConfigSource, DEFAULT_MAX_TOKENS, DEFAULT_PROVIDER,
    DEFAULT_STAGE_TIMEOUT_SECS, DEFAULT_TEMPERATURE, Defaults, MIN_STAGE_TIMEOUT_SECS,
    ProviderConfig, ProviderKind, ProviderOverrides, builtin_providers,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_kind_round_trips_through_strings() {
        assert_eq!(ProviderKind::from_str("openai").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
        assert!(ProviderKind::from_str("cohere").is_err());
    }

    #[test]
    fn test_provider_for_prefers_project_selection() {
        let config = Config::builtin().unwrap();
        assert_eq!(config.provider_for(Some("openai")).unwrap().name, "openai");
        assert_eq!(config.provider_for(None).unwrap().name, DEFAULT_PROVIDER);
        assert_eq!(config.provider_for(Some("  ")).unwrap().name, DEFAULT_PROVIDER);
        assert!(config.provider_for(Some("cohere")).is_none());
    }

    #[test]
    fn test_stage_timeout_is_clamped() {
        let mut config = Config::builtin().unwrap();
        config.defaults.stage_timeout_secs = 1;
        assert_eq!(config.stage_timeout().as_secs(), MIN_STAGE_TIMEOUT_SECS);
    }

    #[test]
    fn test_effective_config_reports_sources() {
        let config = Config::builtin().unwrap();
        let effective = config.effective_config();
        assert_eq!(
            effective["provider"],
            ("anthropic".to_string(), "default".to_string())
        );
    }
}
