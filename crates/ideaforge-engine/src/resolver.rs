//! Tech stack resolution
//!
//! A project either names its stack explicitly or lets the model choose one
//! of its category's stacks. Every failure path ends in the category's first
//! stack, so resolution never fails once a category exists.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use ideaforge_config::catalog::DEFAULT_APPLICATION_TYPE;
use ideaforge_config::{ApplicationCategory, ProviderConfig, StackRecord, TechStackCatalog};
use ideaforge_llm::{LlmInvocation, Message, ProviderGateway};
use ideaforge_utils::error::{ConfigError, PipelineError};
use ideaforge_validation::parse_selected_stack_id;

/// Invocation purpose for the stack selection call
pub const PURPOSE_STACK_SELECTION: &str = "stack_selection";

/// How a stack was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StackSource {
    Explicit,
    ModelSelected,
    Fallback,
}

/// A stack frozen for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStack {
    pub application_type: String,
    pub stack: StackRecord,
    pub source: StackSource,
}

/// Provider call used when the model picks the stack
pub struct SelectionCall<'a> {
    pub gateway: &'a ProviderGateway,
    pub provider: &'a ProviderConfig,
    pub project_id: &'a str,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TechStackResolver {
    catalog: Arc<TechStackCatalog>,
}

impl TechStackResolver {
    pub fn new(catalog: Arc<TechStackCatalog>) -> Self {
        Self { catalog }
    }

    /// Category for an application type; unknown or absent ids use the default
    pub fn category_for(
        &self,
        application_type_id: Option<&str>,
    ) -> Result<&ApplicationCategory, PipelineError> {
        if let Some(id) = application_type_id.filter(|id| !id.trim().is_empty()) {
            if let Some(category) = self.catalog.category(id) {
                return Ok(category);
            }
            warn!(
                application_type = %id,
                fallback = DEFAULT_APPLICATION_TYPE,
                "Unknown application type, using default category"
            );
        }
        self.catalog
            .category(DEFAULT_APPLICATION_TYPE)
            .or_else(|| self.catalog.categories.first())
            .ok_or_else(|| {
                PipelineError::Config(ConfigError::MissingRequired(
                    "tech stack catalog has no categories".to_string(),
                ))
            })
    }

    /// Look up an explicitly selected stack
    ///
    /// # Errors
    ///
    /// `PipelineError::UnknownStackId` when the category has no such stack
    pub fn lookup(
        &self,
        category: &ApplicationCategory,
        stack_id: &str,
    ) -> Result<StackRecord, PipelineError> {
        category
            .stack(stack_id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownStackId {
                application_type: category.id.clone(),
                stack_id: stack_id.to_string(),
            })
    }

    /// Map a model reply (or its absence) onto a stack of `category`
    pub fn choose(
        &self,
        category: &ApplicationCategory,
        reply: Option<&str>,
    ) -> Result<ResolvedStack, PipelineError> {
        if let Some(id) = reply.and_then(parse_selected_stack_id) {
            match self.lookup(category, &id) {
                Ok(stack) => {
                    return Ok(ResolvedStack {
                        application_type: category.id.clone(),
                        stack,
                        source: StackSource::ModelSelected,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Model selected an unknown stack, falling back");
                }
            }
        } else if reply.is_some() {
            warn!(
                application_type = %category.id,
                "Stack selection reply had no usable id, falling back"
            );
        }
        self.fallback(category)
    }

    fn fallback(&self, category: &ApplicationCategory) -> Result<ResolvedStack, PipelineError> {
        let stack = category.first_stack().cloned().ok_or_else(|| {
            PipelineError::Config(ConfigError::MissingRequired(format!(
                "category '{}' has no tech stacks",
                category.id
            )))
        })?;
        Ok(ResolvedStack {
            application_type: category.id.clone(),
            stack,
            source: StackSource::Fallback,
        })
    }

    /// Messages asking the model to pick one of the category's stacks
    pub fn selection_messages(
        &self,
        category: &ApplicationCategory,
        requirements_text: &str,
    ) -> Vec<Message> {
        let options = category
            .tech_stacks
            .iter()
            .map(|s| {
                format!(
                    "- `{}`: {} ({}). Frontend: {}. Backend: {}. Database: {}.",
                    s.id, s.name, s.description, s.frontend.name, s.backend.name, s.database.name
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        vec![
            Message::system(
                "You are a senior full stack developer choosing a technology stack. \
                 Answer with JSON only.",
            ),
            Message::user(format!(
                "Application type: {} ({})\n\nRequirements:\n{}\n\nAvailable stacks:\n{}\n\n\
                 Pick the stack that best fits the requirements. Respond with ONLY:\n\
                 {{\"selectedStackId\": \"<id from the list>\"}}\n",
                category.name,
                category.id,
                requirements_text.trim(),
                options
            )),
        ]
    }

    /// Resolve the stack for a project.
    ///
    /// An explicit id is looked up directly. An unknown explicit id, an
    /// unusable model reply and a failed selection call all fall back to the
    /// category's first stack with a warning.
    pub async fn resolve(
        &self,
        application_type_id: Option<&str>,
        explicit_stack_id: Option<&str>,
        requirements_text: &str,
        call: SelectionCall<'_>,
    ) -> Result<ResolvedStack, PipelineError> {
        let category = self.category_for(application_type_id)?;

        if let Some(stack_id) = explicit_stack_id.filter(|id| !id.trim().is_empty()) {
            match self.lookup(category, stack_id) {
                Ok(stack) => {
                    return Ok(ResolvedStack {
                        application_type: category.id.clone(),
                        stack,
                        source: StackSource::Explicit,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Explicit stack not in catalog, falling back");
                    return self.fallback(category);
                }
            }
        }

        let inv = LlmInvocation::new(
            call.project_id,
            PURPOSE_STACK_SELECTION,
            call.timeout,
            self.selection_messages(category, requirements_text),
        );
        let resolved = match call.gateway.invoke(call.provider, inv).await {
            Ok(result) => self.choose(category, Some(&result.raw_response))?,
            Err(err) => {
                warn!(error = %err, "Stack selection call failed, falling back");
                self.choose(category, None)?
            }
        };

        info!(
            project_id = %call.project_id,
            application_type = %resolved.application_type,
            stack = %resolved.stack.id,
            source = %resolved.source,
            "Resolved tech stack"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaforge_config::ProviderKind;
    use ideaforge_llm::{LlmError, ScriptedBackend};

    fn resolver() -> TechStackResolver {
        TechStackResolver::new(Arc::new(TechStackCatalog::builtin().unwrap()))
    }

    fn provider() -> ProviderConfig {
        ProviderConfig::builtin("anthropic", ProviderKind::Anthropic)
    }

    async fn resolve_with(
        backend: ScriptedBackend,
        app_type: Option<&str>,
        explicit: Option<&str>,
    ) -> (ResolvedStack, usize) {
        let backend = Arc::new(backend);
        let gateway = ProviderGateway::with_backend(backend.clone());
        let provider = provider();
        let resolved = resolver()
            .resolve(
                app_type,
                explicit,
                "Build a todo app",
                SelectionCall {
                    gateway: &gateway,
                    provider: &provider,
                    project_id: "1",
                    timeout: Duration::from_secs(5),
                },
            )
            .await
            .unwrap();
        (resolved, backend.call_count())
    }

    #[tokio::test]
    async fn test_explicit_stack_skips_provider() {
        let (resolved, calls) = resolve_with(
            ScriptedBackend::constant("unused"),
            Some("web_application"),
            Some("vue_python"),
        )
        .await;
        assert_eq!(resolved.stack.id, "vue_python");
        assert_eq!(resolved.source, StackSource::Explicit);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_unknown_explicit_stack_falls_back_to_first() {
        let (resolved, calls) = resolve_with(
            ScriptedBackend::constant("unused"),
            Some("web_application"),
            Some("cobol_mainframe"),
        )
        .await;
        assert_eq!(resolved.stack.id, "react_nodejs");
        assert_eq!(resolved.source, StackSource::Fallback);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_model_selected_stack() {
        let (resolved, calls) = resolve_with(
            ScriptedBackend::constant(r#"{"selectedStackId": "flutter_python"}"#),
            Some("mobile_app"),
            None,
        )
        .await;
        assert_eq!(resolved.stack.id, "flutter_python");
        assert_eq!(resolved.source, StackSource::ModelSelected);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_model_selected_unknown_id_falls_back() {
        let (resolved, _) = resolve_with(
            ScriptedBackend::constant(r#"{"selectedStackId": "react_nodejs"}"#),
            Some("automation_script"),
            None,
        )
        .await;
        assert_eq!(resolved.application_type, "automation_script");
        assert_eq!(resolved.stack.id, "python_script");
        assert_eq!(resolved.source, StackSource::Fallback);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let (resolved, _) = resolve_with(
            ScriptedBackend::new(|_| Err(LlmError::ProviderQuota("429".into()))),
            Some("static_website"),
            None,
        )
        .await;
        assert_eq!(resolved.stack.id, "html_css_js");
        assert_eq!(resolved.source, StackSource::Fallback);
    }

    #[tokio::test]
    async fn test_unknown_application_type_uses_web_application() {
        let (resolved, _) = resolve_with(
            ScriptedBackend::constant("no idea"),
            Some("spaceship"),
            None,
        )
        .await;
        assert_eq!(resolved.application_type, "web_application");
        assert_eq!(resolved.stack.id, "react_nodejs");
    }

    #[test]
    fn test_lookup_reports_unknown_stack_id() {
        let resolver = resolver();
        let category = resolver.category_for(Some("web_application")).unwrap();
        match resolver.lookup(category, "nope").unwrap_err() {
            PipelineError::UnknownStackId {
                application_type,
                stack_id,
            } => {
                assert_eq!(application_type, "web_application");
                assert_eq!(stack_id, "nope");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_selection_prompt_lists_every_stack() {
        let resolver = resolver();
        let category = resolver.category_for(Some("desktop_application")).unwrap();
        let messages = resolver.selection_messages(category, "Notes app");
        for stack in &category.tech_stacks {
            assert!(messages[1].content.contains(&format!("`{}`", stack.id)));
        }
        assert!(messages[1].content.contains("selectedStackId"));
    }
}
