//! Project generation: data model, stack resolution and code generation

use std::time::Instant;

use tracing::{Instrument, warn};

use ideaforge_llm::LlmInvocation;
use ideaforge_status::{ArtifactField, Project, StageKind, ensure_can_advance};
use ideaforge_utils::error::PipelineError;
use ideaforge_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use ideaforge_utils::redaction::redact_secrets;

use super::{GenerationEnvelope, Orchestrator};
use crate::codegen::{CodeGenerator, GenerationInputs, GenerationManifest, GenerationOutcome};
use crate::context::ContextPayload;
use crate::resolver::SelectionCall;
use crate::stages::{DataModelStep, PURPOSE_DATA_MODEL};

const ACTION: &str = "generation";

struct GenerationFailure {
    error: PipelineError,
    manifest: Option<GenerationManifest>,
}

impl From<PipelineError> for GenerationFailure {
    fn from(error: PipelineError) -> Self {
        Self {
            error,
            manifest: None,
        }
    }
}

impl Orchestrator {
    /// Generate the project directory.
    ///
    /// Requires a UX design. The data model is drafted first; its failure
    /// only adds a warning. Project fields are written only once at least one
    /// file landed on disk.
    pub async fn run_generation(&self, project_id: &str) -> GenerationEnvelope {
        let stage = StageKind::ProjectGeneration;
        let span = stage_span(project_id, stage.as_str());
        match self.try_run_generation(project_id).instrument(span).await {
            Ok((manifest, status)) => GenerationEnvelope::ok(project_id, manifest, status),
            Err(failure) => {
                let err = failure.error;
                log_stage_error(project_id, stage.as_str(), err.kind(), &err.to_string());
                GenerationEnvelope::failed(project_id, &err, failure.manifest)
            }
        }
    }

    async fn try_run_generation(
        &self,
        project_id: &str,
    ) -> Result<(GenerationManifest, &'static str), GenerationFailure> {
        let stage = StageKind::ProjectGeneration;
        let _guard = self
            .locks
            .try_acquire(project_id, ACTION)
            .map_err(PipelineError::from)?;
        let project = self.store.load_project(project_id)?;
        ensure_can_advance(&project, stage)?;

        let provider = self.provider_for(&project)?;
        log_stage_start(project_id, stage.as_str(), &provider.name);
        let started = Instant::now();

        let mut warnings = Vec::new();
        let data_model = match self.draft_data_model(&project).await {
            Ok(model) => Some(model),
            Err(err) => {
                warn!(error = %redact_secrets(&err.to_string()), "Data model step failed, continuing without it");
                warnings.push(format!("data model: {err}"));
                None
            }
        };

        let requirements_text = project
            .refined_requirements
            .as_deref()
            .unwrap_or(&project.requirements);
        let resolved = self
            .resolver
            .resolve(
                project.application_type_id.as_deref(),
                project.tech_stack_id.as_deref(),
                requirements_text,
                SelectionCall {
                    gateway: &self.gateway,
                    provider,
                    project_id,
                    timeout: self.stage_timeout,
                },
            )
            .await?;

        let generator = CodeGenerator::new(self.gateway.clone(), provider.clone(), self.stage_timeout);
        let manifest = generator
            .generate(
                &project,
                &resolved,
                GenerationInputs {
                    architecture: project.architecture.as_deref().unwrap_or_default(),
                    data_model: data_model.as_deref(),
                    prior_warnings: &warnings,
                },
                &self.output_root,
            )
            .await?;

        if manifest.outcome == GenerationOutcome::Failed {
            return Err(GenerationFailure {
                error: PipelineError::DestinationUnwritable {
                    path: manifest.root.to_string(),
                    reason: "no file could be written".to_string(),
                },
                manifest: Some(manifest),
            });
        }

        let mut fields = vec![(ArtifactField::GeneratedPath, manifest.root.as_str())];
        if let Some(model) = &data_model {
            fields.insert(0, (ArtifactField::DataModel, model.as_str()));
        }
        self.store.save_artifacts(project_id, &fields)?;
        let status = self.refresh_status(project_id)?;

        log_stage_complete(project_id, stage.as_str(), started.elapsed().as_millis());
        Ok((manifest, status))
    }

    async fn draft_data_model(&self, project: &Project) -> Result<String, PipelineError> {
        let provider = self.provider_for(project)?;
        let ctx = ContextPayload::for_stage(project, StageKind::ProjectGeneration);
        let inv = LlmInvocation::new(
            &project.id,
            PURPOSE_DATA_MODEL,
            self.stage_timeout,
            DataModelStep::messages(&ctx),
        );
        let result = self.gateway.invoke(provider, inv).await?;
        Ok(DataModelStep::postprocess(&result.raw_response)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use ideaforge_config::Config;
    use ideaforge_llm::{LlmError, ProviderGateway, ScriptedBackend};
    use ideaforge_status::{ArtifactField, Project, StageKind};

    use crate::codegen::{DATA_MODEL_DOC, GenerationOutcome};
    use crate::orchestrator::Orchestrator;
    use crate::resolver::StackSource;
    use crate::store::{ArtifactStore, MemoryStore};

    fn designed_project() -> Project {
        let mut p = Project::new("4", "Lesson Planner", "Plan guitar lessons", "anthropic")
            .with_application_type("web_application")
            .with_tech_stack("vue_python");
        p.refined_requirements = Some("Refined".into());
        p.architecture = Some("# System Architecture\n\nFastAPI + Vue".into());
        p.ux_design = Some("# UX Design\n\nOne screen".into());
        p
    }

    fn setup(backend: ScriptedBackend, project: Project) -> (Orchestrator, Arc<MemoryStore>, TempDir, Arc<ScriptedBackend>) {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryStore::new());
        store.insert(project);
        let orch = Orchestrator::new(
            Arc::new(Config::builtin().unwrap()),
            store.clone(),
            ProviderGateway::with_backend(backend.clone()),
        )
        .with_output_root(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        (orch, store, dir, backend)
    }

    fn replies(inv: &ideaforge_llm::LlmInvocation) -> Result<String, LlmError> {
        if inv.purpose == "data_model" {
            Ok("# Data Model\n\n## Entities\n- Lesson(id, title)".into())
        } else {
            Ok("```\ncontent\n```".into())
        }
    }

    #[tokio::test]
    async fn test_generation_writes_files_and_fields() {
        let (orch, store, _dir, backend) = setup(ScriptedBackend::new(replies), designed_project());

        let env = orch.run_generation("4").await;
        assert!(env.success, "{env:?}");
        assert_eq!(env.status.as_deref(), Some("Project Generated"));
        let manifest = env.manifest.unwrap();
        assert_eq!(manifest.stack_id, "vue_python");
        assert_eq!(manifest.stack_source, StackSource::Explicit);
        assert_eq!(manifest.outcome, GenerationOutcome::Completed);
        assert_eq!(manifest.files.last().map(String::as_str), Some(DATA_MODEL_DOC));
        assert!(manifest.root.ends_with("4_lesson_planner"));

        let project = store.load_project("4").unwrap();
        assert_eq!(project.generated_path.as_deref(), Some(manifest.root.as_str()));
        assert!(project.data_model.unwrap().contains("Lesson(id, title)"));

        let purposes = backend.purposes();
        assert_eq!(purposes[0], "data_model");
        assert!(purposes.iter().all(|p| p != "stack_selection"));
    }

    #[tokio::test]
    async fn test_data_model_failure_is_a_warning() {
        let backend = ScriptedBackend::new(|inv| {
            if inv.purpose == "data_model" {
                Err(LlmError::ProviderQuota("slow down".into()))
            } else {
                Ok("body".into())
            }
        });
        let (orch, store, _dir, _) = setup(backend, designed_project());

        let env = orch.run_generation("4").await;
        let manifest = env.manifest.unwrap();
        assert_eq!(manifest.outcome, GenerationOutcome::CompletedWithWarnings);
        assert!(manifest.warnings[0].starts_with("data model:"));
        assert!(!manifest.files.iter().any(|f| f == DATA_MODEL_DOC));
        assert!(store.load_project("4").unwrap().data_model.is_none());
    }

    #[tokio::test]
    async fn test_generation_requires_ux_design() {
        let mut project = designed_project();
        project.ux_design = None;
        let (orch, _store, _dir, backend) = setup(ScriptedBackend::new(replies), project);

        let env = orch.run_stage("4", StageKind::ProjectGeneration).await;
        assert_eq!(env.stage, StageKind::ProjectGeneration);
        assert_eq!(env.error_kind(), Some("StagePrerequisiteNotMet"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_root_leaves_fields_untouched() {
        let (orch, store, dir, _) = setup(ScriptedBackend::new(replies), designed_project());
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file").unwrap();
        let orch = orch.with_output_root(Utf8PathBuf::from_path_buf(blocker).unwrap());
        let before = store.load_project("4").unwrap();

        let env = orch.run_generation("4").await;
        assert_eq!(env.error_kind(), Some("DestinationUnwritable"));
        assert!(env.manifest.is_none());
        assert_eq!(store.load_project("4").unwrap(), before);
        assert!(!store.load_project("4").unwrap().has_artifact(ArtifactField::GeneratedPath));
    }
}
