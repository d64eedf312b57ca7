//! Tech-stack catalog: application categories and their concrete stacks
//!
//! The catalog is reference data. It is parsed once at startup (from the
//! built-in table or an override file), validated, and then shared read-only.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use ideaforge_utils::error::ConfigError;

/// Built-in catalog shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Category used when a project names no category or an unknown one
pub const DEFAULT_APPLICATION_TYPE: &str = "web_application";

/// Marker used by catalog entries for an absent component
pub const NONE_MARKER: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSpec {
    pub name: String,
    pub language: String,
    pub framework: String,
    pub styling: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSpec {
    pub name: String,
    pub language: String,
    pub framework: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub name: String,
    pub platform: String,
    pub containerization: String,
}

/// One fully-specified technology stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub frontend: FrontendSpec,
    pub backend: BackendSpec,
    pub database: DatabaseSpec,
    pub deployment: DeploymentSpec,
}

impl StackRecord {
    pub fn has_backend(&self) -> bool {
        !is_none(&self.backend.language)
    }

    pub fn has_frontend(&self) -> bool {
        !is_none(&self.frontend.language)
    }

    pub fn uses_docker(&self) -> bool {
        self.deployment.containerization.eq_ignore_ascii_case("docker")
    }
}

/// An application category with its ordered stack list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tech_stacks: Vec<StackRecord>,
}

impl ApplicationCategory {
    /// The category's preferred stack
    pub fn first_stack(&self) -> Option<&StackRecord> {
        self.tech_stacks.first()
    }

    pub fn stack(&self, stack_id: &str) -> Option<&StackRecord> {
        self.tech_stacks.iter().find(|s| s.id == stack_id)
    }
}

/// The full catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStackCatalog {
    pub categories: Vec<ApplicationCategory>,
}

impl TechStackCatalog {
    /// Parse the catalog compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Load and validate a catalog from a TOML file
    pub fn from_path(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_string(),
                }
            } else {
                ConfigError::InvalidFile(format!("{path}: {e}"))
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let catalog: TechStackCatalog = toml::from_str(content)
            .map_err(|e| ConfigError::InvalidFile(format!("tech stack catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn category(&self, application_type_id: &str) -> Option<&ApplicationCategory> {
        self.categories.iter().find(|c| c.id == application_type_id)
    }

    /// Stacks for a category, or an empty slice for an unknown category
    pub fn stacks_for(&self, application_type_id: &str) -> &[StackRecord] {
        self.category(application_type_id)
            .map(|c| c.tech_stacks.as_slice())
            .unwrap_or(&[])
    }

    pub fn stack_by_id(&self, application_type_id: &str, stack_id: &str) -> Option<&StackRecord> {
        self.category(application_type_id)
            .and_then(|c| c.stack(stack_id))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.categories.is_empty() {
            errors.push("catalog has no categories".to_string());
        }

        let mut category_ids = std::collections::HashSet::new();
        for category in &self.categories {
            if !category_ids.insert(category.id.as_str()) {
                errors.push(format!("duplicate category id '{}'", category.id));
            }
            if category.tech_stacks.is_empty() {
                errors.push(format!("category '{}' has no tech stacks", category.id));
            }
            let mut stack_ids = std::collections::HashSet::new();
            for stack in &category.tech_stacks {
                if stack.id.trim().is_empty() {
                    errors.push(format!("category '{}' has a stack with an empty id", category.id));
                }
                if !stack_ids.insert(stack.id.as_str()) {
                    errors.push(format!(
                        "duplicate stack id '{}' in category '{}'",
                        stack.id, category.id
                    ));
                }
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

/// Whether a catalog component value means "not present"
pub fn is_none(value: &str) -> bool {
    value.trim().is_empty() || value.eq_ignore_ascii_case(NONE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = TechStackCatalog::builtin().unwrap();
        let ids: Vec<_> = catalog.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "static_website",
                "web_application",
                "mobile_app",
                "automation_script",
                "desktop_application"
            ]
        );
        assert_eq!(catalog.stacks_for("automation_script").len(), 4);
    }

    #[test]
    fn test_first_stack_is_preferred() {
        let catalog = TechStackCatalog::builtin().unwrap();
        let web = catalog.category(DEFAULT_APPLICATION_TYPE).unwrap();
        assert_eq!(web.first_stack().unwrap().id, "react_nodejs");
    }

    #[test]
    fn test_stack_lookup() {
        let catalog = TechStackCatalog::builtin().unwrap();
        let stack = catalog.stack_by_id("web_application", "vue_python").unwrap();
        assert_eq!(stack.backend.framework, "FastAPI");
        assert_eq!(stack.database.kind, "Relational");
        assert!(stack.uses_docker());

        assert!(catalog.stack_by_id("web_application", "jekyll").is_none());
        assert!(catalog.stack_by_id("nope", "jekyll").is_none());
        assert!(catalog.stacks_for("nope").is_empty());
    }

    #[test]
    fn test_component_presence() {
        let catalog = TechStackCatalog::builtin().unwrap();
        let static_site = catalog.stack_by_id("static_website", "html_css_js").unwrap();
        assert!(!static_site.has_backend());
        assert!(static_site.has_frontend());

        let script = catalog.stack_by_id("automation_script", "bash_script").unwrap();
        assert!(script.has_backend());
        assert!(!script.has_frontend());
    }

    #[test]
    fn test_validation_rejects_empty_category() {
        let toml = r#"
[[categories]]
id = "empty"
name = "Empty"
description = "no stacks"
tech_stacks = []
"#;
        match TechStackCatalog::from_toml_str(toml) {
            Err(ConfigError::ValidationFailed { errors, .. }) => {
                assert!(errors[0].contains("no tech stacks"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = TechStackCatalog::from_path(Utf8Path::new("/definitely/not/here.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
