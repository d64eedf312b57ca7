use ideaforge_utils::error::ConfigError;

use crate::model::{Config, MIN_STAGE_TIMEOUT_SECS};

impl Config {
    /// Validate the resolved configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationFailed`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.defaults.stage_timeout_secs < MIN_STAGE_TIMEOUT_SECS {
            errors.push(format!(
                "defaults.stage_timeout_secs must be at least {MIN_STAGE_TIMEOUT_SECS} (got {})",
                self.defaults.stage_timeout_secs
            ));
        }

        if !self.providers.contains_key(&self.defaults.provider) {
            errors.push(format!(
                "defaults.provider '{}' is not a configured provider (known: {})",
                self.defaults.provider,
                self.providers.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }

        for (name, provider) in &self.providers {
            if provider.max_tokens == 0 {
                errors.push(format!("providers.{name}.max_tokens must be greater than 0"));
            }
            if provider.model.trim().is_empty() {
                errors.push(format!("providers.{name}.model must not be empty"));
            }
            if !(0.0..=2.0).contains(&provider.temperature) {
                errors.push(format!(
                    "providers.{name}.temperature must be between 0.0 and 2.0 (got {})",
                    provider.temperature
                ));
            }
            if let Some(url) = &provider.base_url
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                errors.push(format!("providers.{name}.base_url must be an http(s) URL"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            })
        }
    }
}
