use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::catalog::TechStackCatalog;
use crate::model::{
    CliArgs, Config, ConfigSource, Defaults, ProviderConfig, ProviderKind, ProviderOverrides,
    builtin_providers,
};

/// Directory holding project-local configuration
pub const CONFIG_DIR: &str = ".ideaforge";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<TomlDefaults>,
    #[serde(default)]
    providers: BTreeMap<String, ProviderOverrides>,
    catalog: Option<TomlCatalog>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlDefaults {
    provider: Option<String>,
    stage_timeout_secs: Option<u64>,
    output_dir: Option<Utf8PathBuf>,
    store_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlCatalog {
    path: Option<Utf8PathBuf>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Searches upward from the current directory for `.ideaforge/config.toml`,
    /// then falls back to the user config directory
    /// (`<config_dir>/ideaforge/config.toml`).
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        let start_dir = Utf8PathBuf::from_path_buf(start_dir)
            .map_err(|p| anyhow::anyhow!("Current directory is not UTF-8: {}", p.display()))?;

        if cli_args.config_path.is_none()
            && Self::discover_config_file_from(&start_dir)?.is_none()
            && let Some(user_config) = user_config_file()
        {
            let mut args = cli_args.clone();
            args.config_path = Some(user_config);
            return Self::discover_from(&start_dir, &args);
        }

        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Utf8Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut providers = builtin_providers();
        let mut catalog_path: Option<Utf8PathBuf> = None;

        for key in ["provider", "stage_timeout_secs", "output_dir", "store_path", "catalog"] {
            source_attribution.insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {path}"))?;
            let config_source = ConfigSource::ConfigFile(path.clone());
            // Relative paths in the file are relative to the project root
            // (the directory containing .ideaforge/), not the cwd.
            let base_dir = config_base_dir(path);

            if let Some(file_defaults) = file_config.defaults {
                if let Some(provider) = file_defaults.provider {
                    defaults.provider = provider;
                    source_attribution.insert("provider".to_string(), config_source.clone());
                }
                if let Some(timeout) = file_defaults.stage_timeout_secs {
                    defaults.stage_timeout_secs = timeout;
                    source_attribution
                        .insert("stage_timeout_secs".to_string(), config_source.clone());
                }
                if let Some(output_dir) = file_defaults.output_dir {
                    defaults.output_dir = resolve_relative(&base_dir, output_dir);
                    source_attribution.insert("output_dir".to_string(), config_source.clone());
                }
                if let Some(store_path) = file_defaults.store_path {
                    defaults.store_path = resolve_relative(&base_dir, store_path);
                    source_attribution.insert("store_path".to_string(), config_source.clone());
                }
            }

            for (name, overrides) in &file_config.providers {
                let entry = providers.entry(name.clone()).or_insert_with(|| {
                    ProviderConfig::builtin(name, overrides.kind.unwrap_or(ProviderKind::OpenAi))
                });
                overrides.apply_to(entry);
                source_attribution.insert(format!("providers.{name}"), config_source.clone());
            }

            if let Some(path) = file_config.catalog.and_then(|c| c.path) {
                catalog_path = Some(resolve_relative(&base_dir, path));
                source_attribution.insert("catalog".to_string(), config_source.clone());
            }
        }

        if let Some(provider) = &cli_args.provider {
            defaults.provider = provider.clone();
            source_attribution.insert("provider".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.stage_timeout_secs {
            defaults.stage_timeout_secs = timeout;
            source_attribution.insert("stage_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(output_dir) = &cli_args.output_dir {
            defaults.output_dir = output_dir.clone();
            source_attribution.insert("output_dir".to_string(), ConfigSource::Cli);
        }
        if let Some(store_path) = &cli_args.store_path {
            defaults.store_path = store_path.clone();
            source_attribution.insert("store_path".to_string(), ConfigSource::Cli);
        }

        let catalog = match &catalog_path {
            Some(path) => TechStackCatalog::from_path(path)
                .with_context(|| format!("Failed to load tech stack catalog: {path}"))?,
            None => TechStackCatalog::builtin()?,
        };

        let config = Self {
            defaults,
            providers,
            catalog: Arc::new(catalog),
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.ideaforge/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or the
    /// filesystem root.
    pub fn discover_config_file_from(start_dir: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Utf8Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse TOML config file: {path}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ideaforge_utils::error::ConfigError::NotFound {
                    path: path.to_string(),
                }
                .into(),
            ),
            Err(e) => Err(anyhow::anyhow!("Failed to read config file {path}: {e}")),
        }
    }
}

/// `<dirs::config_dir()>/ideaforge/config.toml`, if it exists
fn user_config_file() -> Option<Utf8PathBuf> {
    let dir = dirs::config_dir()?;
    let path = Utf8PathBuf::from_path_buf(dir.join("ideaforge").join(CONFIG_FILE)).ok()?;
    path.exists().then_some(path)
}

/// Directory that relative paths in a config file resolve against
fn config_base_dir(config_path: &Utf8Path) -> Utf8PathBuf {
    let parent = config_path.parent().unwrap_or(Utf8Path::new("."));
    if parent.file_name() == Some(CONFIG_DIR) {
        parent.parent().unwrap_or(Utf8Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

fn resolve_relative(base: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() || base.as_str().is_empty() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_STAGE_TIMEOUT_SECS;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn write_config(root: &Utf8Path, content: &str) -> Utf8PathBuf {
        let dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_config_file() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir(root.join(".git")).unwrap();

        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();
        assert_eq!(config.defaults.provider, "anthropic");
        assert_eq!(config.defaults.stage_timeout_secs, DEFAULT_STAGE_TIMEOUT_SECS);
        assert_eq!(config.source_attribution["provider"], ConfigSource::Defaults);
        assert!(config.provider("openai").is_some());
    }

    #[test]
    fn test_discovers_config_in_ancestor() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let path = write_config(&root, "[defaults]\nprovider = \"openai\"\n");
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config_file_from(&nested).unwrap();
        assert_eq!(found, Some(path.clone()));

        let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();
        assert_eq!(config.defaults.provider, "openai");
        assert_eq!(
            config.source_attribution["provider"],
            ConfigSource::ConfigFile(path)
        );
    }

    #[test]
    fn test_search_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        write_config(&root, "[defaults]\nprovider = \"openai\"\n");
        let repo = root.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(Config::discover_config_file_from(&repo).unwrap(), None);
    }

    #[test]
    fn test_provider_overrides_and_new_providers() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        write_config(
            &root,
            r#"
[providers.anthropic]
model = "claude-opus-4-1"
max_tokens = 8000

[providers.local]
kind = "openai"
display_name = "Local vLLM"
model = "qwen2.5-coder"
base_url = "http://localhost:8000/v1/chat/completions"
api_key_env = "LOCAL_LLM_KEY"
"#,
        );

        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();
        let anthropic = config.provider("anthropic").unwrap();
        assert_eq!(anthropic.model, "claude-opus-4-1");
        assert_eq!(anthropic.max_tokens, 8000);
        assert_eq!(anthropic.api_key_env, "ANTHROPIC_API_KEY");

        let local = config.provider("local").unwrap();
        assert_eq!(local.kind, ProviderKind::OpenAi);
        assert_eq!(local.display_name, "Local vLLM");
        assert_eq!(local.api_key_env, "LOCAL_LLM_KEY");
        assert!(local.active);
    }

    #[test]
    fn test_cli_overrides_file() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        write_config(&root, "[defaults]\nstage_timeout_secs = 30\n");

        let args = CliArgs {
            stage_timeout_secs: Some(90),
            output_dir: Some(Utf8PathBuf::from("/tmp/out")),
            ..CliArgs::default()
        };
        let config = Config::discover_from(&root, &args).unwrap();
        assert_eq!(config.defaults.stage_timeout_secs, 90);
        assert_eq!(config.source_attribution["stage_timeout_secs"], ConfigSource::Cli);
        assert_eq!(config.defaults.output_dir, Utf8PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_relative_paths_resolve_against_project_root() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        write_config(&root, "[defaults]\noutput_dir = \"generated\"\n");

        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();
        assert_eq!(config.defaults.output_dir, root.join("generated"));
    }

    #[test]
    fn test_catalog_override_file() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(
            root.join("stacks.toml"),
            r#"
[[categories]]
id = "cli_tool"
name = "CLI Tool"
description = "Command-line utilities"

[[categories.tech_stacks]]
id = "python_click"
name = "Python + Click"
description = "Click-based CLI"
frontend = { name = "None", language = "None", framework = "None", styling = "None" }
backend = { name = "Python", language = "Python", framework = "Click" }
database = { name = "None", type = "None" }
deployment = { name = "PyPI", platform = "PyPI", containerization = "None" }
"#,
        )
        .unwrap();
        write_config(&root, "[catalog]\npath = \"stacks.toml\"\n");

        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();
        assert_eq!(config.catalog.categories.len(), 1);
        assert!(config.catalog.stack_by_id("cli_tool", "python_click").is_some());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        write_config(&root, "[defaults\nprovider = ");

        let err = Config::discover_from(&root, &CliArgs::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse TOML"));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: Some(utf8(&temp).join("missing.toml")),
            ..CliArgs::default()
        };
        assert!(Config::discover_from(&utf8(&temp), &args).is_err());
    }
}
