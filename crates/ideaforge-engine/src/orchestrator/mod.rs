//! Stage orchestrator
//!
//! Every request follows the same order: take the project's action lock,
//! load the project, check the stage prerequisite, call the provider, and
//! only then persist. Anything that fails before the last step leaves the
//! stored project exactly as it was.

mod envelope;
mod generation;

pub use envelope::{EnvelopeError, GenerationEnvelope, StageEnvelope};

use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{Instrument, debug};

use ideaforge_config::{Config, ProviderConfig};
use ideaforge_llm::{LlmInvocation, ProviderGateway};
use ideaforge_lock::ActionLocks;
use ideaforge_status::{
    ArtifactField, Project, StageKind, StageState, derive_status, ensure_can_advance,
    stage_status,
};
use ideaforge_utils::error::{ConfigError, PipelineError};
use ideaforge_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};

use crate::context::ContextPayload;
use crate::resolver::TechStackResolver;
use crate::stages::stage_for;
use crate::store::{ArtifactStore, NewProject};

/// Derived, read-only view of a project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatusView {
    pub project_id: String,
    pub name: String,
    pub status: String,
    pub ai_provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack_id: Option<String>,
    pub stages: Vec<StageState>,
    /// Non-empty artifact fields
    pub artifacts: Vec<ArtifactField>,
    pub action_in_progress: bool,
}

struct StageSuccess {
    artifact: String,
    status: &'static str,
}

pub struct Orchestrator {
    config: Arc<Config>,
    store: Arc<dyn ArtifactStore>,
    gateway: ProviderGateway,
    locks: ActionLocks,
    resolver: TechStackResolver,
    stage_timeout: Duration,
    output_root: Utf8PathBuf,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, store: Arc<dyn ArtifactStore>, gateway: ProviderGateway) -> Self {
        Self {
            resolver: TechStackResolver::new(config.catalog.clone()),
            stage_timeout: config.stage_timeout(),
            output_root: config.defaults.output_dir.clone(),
            locks: ActionLocks::new(),
            config,
            store,
            gateway,
        }
    }

    /// Override the per-call provider timeout
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Share a lock table with other orchestrators
    #[must_use]
    pub fn with_locks(mut self, locks: ActionLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &ActionLocks {
        &self.locks
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Create a project with only its free-text inputs set
    ///
    /// # Errors
    ///
    /// `PipelineError::Config` when the name or requirements are blank or the
    /// provider is unknown.
    pub fn create_project(&self, mut draft: NewProject) -> Result<Project, PipelineError> {
        if draft.name.trim().is_empty() {
            return Err(invalid("name", "project name must not be empty"));
        }
        if draft.requirements.trim().is_empty() {
            return Err(invalid("requirements", "requirements must not be empty"));
        }
        if draft.ai_provider.trim().is_empty() {
            draft.ai_provider = self.config.defaults.provider.clone();
        }
        if self.config.provider(&draft.ai_provider).is_none() {
            return Err(unknown_provider(&draft.ai_provider));
        }
        self.store.create_project(draft)
    }

    pub fn status(&self, project_id: &str) -> Result<ProjectStatusView, PipelineError> {
        let project = self.store.load_project(project_id)?;
        let artifacts = [
            ArtifactField::Requirements,
            ArtifactField::RefinedRequirements,
            ArtifactField::UserStories,
            ArtifactField::Architecture,
            ArtifactField::UxDesign,
            ArtifactField::DataModel,
            ArtifactField::GeneratedPath,
        ]
        .into_iter()
        .filter(|f| project.has_artifact(*f))
        .collect();

        Ok(ProjectStatusView {
            status: derive_status(&project).to_string(),
            stages: stage_status(&project),
            action_in_progress: self.locks.is_held(project_id),
            project_id: project.id,
            name: project.name,
            ai_provider: project.ai_provider,
            application_type_id: project.application_type_id,
            tech_stack_id: project.tech_stack_id,
            artifacts,
        })
    }

    /// Run one stage for a project.
    ///
    /// `ProjectGeneration` is delegated to [`Orchestrator::run_generation`];
    /// its artifact is the generated project root.
    pub async fn run_stage(&self, project_id: &str, stage: StageKind) -> StageEnvelope {
        if stage == StageKind::ProjectGeneration {
            return self.run_generation(project_id).await.into_stage_envelope();
        }

        let span = stage_span(project_id, stage.as_str());
        match self.try_run_stage(project_id, stage).instrument(span).await {
            Ok(done) => StageEnvelope::ok(project_id, stage, done.artifact, done.status),
            Err(err) => {
                log_stage_error(project_id, stage.as_str(), err.kind(), &err.to_string());
                StageEnvelope::failed(project_id, stage, &err)
            }
        }
    }

    async fn try_run_stage(
        &self,
        project_id: &str,
        stage: StageKind,
    ) -> Result<StageSuccess, PipelineError> {
        let _guard = self.locks.try_acquire(project_id, stage.as_str())?;
        let project = self.store.load_project(project_id)?;
        ensure_can_advance(&project, stage)?;

        let definition = stage_for(stage).ok_or_else(|| invalid("stage", stage.as_str()))?;
        let provider = self.provider_for(&project)?;
        log_stage_start(project_id, stage.as_str(), &provider.name);
        let started = Instant::now();

        let ctx = ContextPayload::for_stage(&project, stage);
        let inv = LlmInvocation::new(
            project_id,
            stage.as_str(),
            self.stage_timeout,
            definition.messages(&ctx),
        );
        let result = self.gateway.invoke(provider, inv).await?;
        debug!(
            model = %result.model_used,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Provider replied"
        );

        let output = definition.postprocess(&result.raw_response)?;

        let mut fields: Vec<(ArtifactField, &str)> = output
            .supplementary
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
            .collect();
        fields.push((stage.descriptor().output, output.artifact.as_str()));
        self.store.save_artifacts(project_id, &fields)?;
        let status = self.refresh_status(project_id)?;

        log_stage_complete(project_id, stage.as_str(), started.elapsed().as_millis());
        Ok(StageSuccess {
            artifact: output.artifact,
            status,
        })
    }

    /// Recompute and store the derived status label
    fn refresh_status(&self, project_id: &str) -> Result<&'static str, PipelineError> {
        let project = self.store.load_project(project_id)?;
        let status = derive_status(&project);
        self.store.save_status(project_id, status)?;
        Ok(status)
    }

    fn provider_for(&self, project: &Project) -> Result<&ProviderConfig, PipelineError> {
        self.config
            .provider_for(Some(&project.ai_provider))
            .ok_or_else(|| unknown_provider(&project.ai_provider))
    }
}

fn invalid(key: &str, value: &str) -> PipelineError {
    PipelineError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn unknown_provider(name: &str) -> PipelineError {
    PipelineError::Config(ConfigError::Provider(format!("unknown AI provider '{name}'")))
}
