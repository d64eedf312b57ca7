//! Code generation engine
//!
//! Turns a resolved stack and the project's design artifacts into a project
//! directory on disk. Static files are rendered locally; manifests and
//! source entry points are requested from the provider one file at a time.
//! A file that cannot be produced is skipped with a warning, so the only
//! fatal error is an unwritable destination.

mod family;
mod templates;

use std::collections::BTreeMap;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use ideaforge_config::{ProviderConfig, StackRecord};
use ideaforge_llm::{LlmInvocation, Message, ProviderGateway};
use ideaforge_status::Project;
use ideaforge_utils::atomic_write::{ensure_writable_dir, write_file_atomic};
use ideaforge_utils::error::PipelineError;
use ideaforge_utils::paths::project_destination;
use ideaforge_utils::redaction::redact_secrets;
use ideaforge_validation::extract_code;

use crate::resolver::{ResolvedStack, StackSource};

pub use family::{
    DATA_MODEL_DOC, FileSource, PlannedFile, StaticTemplate, TemplateFamily, plan_files,
    select_family,
};
pub use templates::TemplateContext;

/// Invocation purpose prefix for per-file content calls
pub const FILE_PURPOSE_PREFIX: &str = "file:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationOutcome {
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "completed with warnings")]
    CompletedWithWarnings,
    #[serde(rename = "failed")]
    Failed,
}

impl GenerationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedWithWarnings => "completed with warnings",
            Self::Failed => "failed",
        }
    }
}

/// Record of one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationManifest {
    /// Destination directory (`<root>/<id>_<slug>`)
    pub root: Utf8PathBuf,
    pub family: TemplateFamily,
    pub stack_id: String,
    pub stack_source: StackSource,
    /// Relative paths written, in template order
    pub files: Vec<String>,
    pub warnings: Vec<String>,
    /// blake3 hex digest per written path
    pub hashes: BTreeMap<String, String>,
    pub outcome: GenerationOutcome,
}

impl GenerationManifest {
    fn new(root: Utf8PathBuf, family: TemplateFamily, resolved: &ResolvedStack) -> Self {
        Self {
            root,
            family,
            stack_id: resolved.stack.id.clone(),
            stack_source: resolved.source,
            files: Vec::new(),
            warnings: Vec::new(),
            hashes: BTreeMap::new(),
            outcome: GenerationOutcome::Failed,
        }
    }

    fn record_file(&mut self, path: &str, content: &str) {
        self.files.push(path.to_string());
        self.hashes.insert(
            path.to_string(),
            blake3::hash(content.as_bytes()).to_hex().to_string(),
        );
    }

    /// Record a warning. Messages are redacted before they are stored.
    pub fn add_warning(&mut self, message: impl AsRef<str>) {
        self.warnings.push(redact_secrets(message.as_ref()));
    }

    fn finish(&mut self) {
        self.outcome = if self.files.is_empty() {
            GenerationOutcome::Failed
        } else if self.warnings.is_empty() {
            GenerationOutcome::Completed
        } else {
            GenerationOutcome::CompletedWithWarnings
        };
    }
}

/// Design inputs for a generation run
#[derive(Debug, Clone, Copy)]
pub struct GenerationInputs<'a> {
    pub architecture: &'a str,
    pub data_model: Option<&'a str>,
    /// Warnings raised before generation started (e.g. by the data-model step)
    pub prior_warnings: &'a [String],
}

pub struct CodeGenerator {
    gateway: ProviderGateway,
    provider: ProviderConfig,
    timeout: Duration,
}

impl CodeGenerator {
    pub fn new(gateway: ProviderGateway, provider: ProviderConfig, timeout: Duration) -> Self {
        Self {
            gateway,
            provider,
            timeout,
        }
    }

    /// Generate the project under `target_root`.
    ///
    /// # Errors
    ///
    /// `PipelineError::DestinationUnwritable` when the destination cannot be
    /// created or written. Nothing is attempted in that case.
    pub async fn generate(
        &self,
        project: &Project,
        resolved: &ResolvedStack,
        inputs: GenerationInputs<'_>,
        target_root: &Utf8Path,
    ) -> Result<GenerationManifest, PipelineError> {
        let destination = project_destination(target_root, &project.id, &project.name);
        ensure_writable_dir(&destination).map_err(|e| PipelineError::DestinationUnwritable {
            path: destination.to_string(),
            reason: format!("{e:#}"),
        })?;

        let (family, plan) = plan_files(&resolved.stack, inputs.data_model.is_some());
        let mut manifest = GenerationManifest::new(destination.clone(), family, resolved);
        for warning in inputs.prior_warnings {
            manifest.add_warning(warning);
        }

        info!(
            project_id = %project.id,
            destination = %destination,
            family = %family,
            stack = %resolved.stack.id,
            files = plan.len(),
            "Generating project"
        );

        let ctx = TemplateContext {
            project_name: &project.name,
            description: &project.description,
            requirements: project
                .refined_requirements
                .as_deref()
                .unwrap_or(&project.requirements),
            stack: &resolved.stack,
            family,
            architecture: inputs.architecture,
            data_model: inputs.data_model,
        };

        for file in &plan {
            let content = match &file.source {
                FileSource::Static(template) => templates::render(*template, &ctx),
                FileSource::Provider { instructions } => {
                    match self.request_file(project, &ctx, file, instructions).await {
                        Ok(content) => content,
                        Err(message) => {
                            warn!(path = %file.path, "Skipping file: {}", redact_secrets(&message));
                            manifest.add_warning(format!("{}: {message}", file.path));
                            continue;
                        }
                    }
                }
            };

            let target = destination.join(&file.path);
            match write_file_atomic(&target, &content) {
                Ok(result) => {
                    debug!(path = %file.path, bytes = result.bytes_written, "Wrote file");
                    manifest.record_file(&file.path, &content);
                }
                Err(e) => {
                    warn!(path = %file.path, "Failed to write file");
                    manifest.add_warning(format!("{}: write failed: {e:#}", file.path));
                }
            }
        }

        manifest.finish();
        info!(
            project_id = %project.id,
            outcome = manifest.outcome.as_str(),
            written = manifest.files.len(),
            warnings = manifest.warnings.len(),
            "Generation finished"
        );
        Ok(manifest)
    }

    async fn request_file(
        &self,
        project: &Project,
        ctx: &TemplateContext<'_>,
        file: &PlannedFile,
        instructions: &str,
    ) -> Result<String, String> {
        let inv = LlmInvocation::new(
            &project.id,
            format!("{FILE_PURPOSE_PREFIX}{}", file.path),
            self.timeout,
            file_messages(ctx, &file.path, instructions),
        )
        .with_metadata("path", serde_json::Value::String(file.path.clone()));

        let result = self
            .gateway
            .invoke(&self.provider, inv)
            .await
            .map_err(|e| e.to_string())?;
        let code = extract_code(&result.raw_response);
        if code.trim().is_empty() {
            return Err("provider returned empty content".to_string());
        }
        Ok(code)
    }
}

fn stack_line(stack: &StackRecord) -> String {
    format!(
        "{} (frontend: {}, backend: {}, database: {}, deployment: {})",
        stack.name, stack.frontend.name, stack.backend.name, stack.database.name, stack.deployment.name
    )
}

fn file_messages(ctx: &TemplateContext<'_>, path: &str, instructions: &str) -> Vec<Message> {
    let mut prompt = format!(
        "# Project: {name}\n\n## Requirements\n\n{requirements}\n\n## Tech Stack\n\n{stack}\n\n\
         ## Architecture\n\n{architecture}\n",
        name = ctx.project_name,
        requirements = ctx.requirements.trim(),
        stack = stack_line(ctx.stack),
        architecture = ctx.architecture.trim(),
    );
    if let Some(data_model) = ctx.data_model {
        prompt.push_str(&format!("\n## Data Model\n\n{}\n", data_model.trim()));
    }
    prompt.push_str(&format!(
        "\n## File\n\nPath: `{path}`\n\n{instructions}\n\n\
         Respond with the complete content of this one file inside a single fenced code \
         block. No explanation before or after it.\n"
    ));

    vec![
        Message::system(
            "You are a senior developer generating one file of a working starter project. \
             Write complete, runnable code that follows the architecture. Never leave \
             placeholders such as TODO or 'implement here'.",
        ),
        Message::user(prompt),
    ]
}
