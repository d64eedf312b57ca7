//! Artifact store boundary
//!
//! The pipeline only reads projects by id and writes artifact fields. Each
//! write call is atomic for every field it touches, so a reader never sees
//! a half-updated artifact or half of a stage's output.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use ideaforge_status::{ArtifactField, Project};
use ideaforge_utils::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Fields supplied when a project is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub requirements: String,
    pub application_type_id: Option<String>,
    pub tech_stack_id: Option<String>,
    pub ai_provider: String,
}

impl NewProject {
    pub(crate) fn into_project(self, id: String) -> Project {
        let mut project = Project::new(id, self.name, self.requirements, self.ai_provider)
            .with_description(self.description);
        project.application_type_id = self.application_type_id;
        project.tech_stack_id = self.tech_stack_id;
        project
    }
}

/// Persistence used by the orchestrator
pub trait ArtifactStore: Send + Sync {
    /// # Errors
    ///
    /// `PipelineError::ProjectNotFound` for an unknown id
    fn load_project(&self, id: &str) -> Result<Project, PipelineError>;

    /// Replace several artifact fields in one write and bump `updated_at`
    ///
    /// Either every field is stored or none is.
    fn save_artifacts(
        &self,
        id: &str,
        fields: &[(ArtifactField, &str)],
    ) -> Result<(), PipelineError>;

    /// Replace one artifact field and bump `updated_at`
    fn save_artifact(
        &self,
        id: &str,
        field: ArtifactField,
        value: &str,
    ) -> Result<(), PipelineError> {
        self.save_artifacts(id, &[(field, value)])
    }

    fn save_status(&self, id: &str, status: &str) -> Result<(), PipelineError>;

    /// Allocate an id and persist a new project
    fn create_project(&self, draft: NewProject) -> Result<Project, PipelineError>;
}

/// Apply a batch of field updates to an in-memory record
pub(crate) fn apply_artifacts(project: &mut Project, fields: &[(ArtifactField, &str)]) {
    for (field, value) in fields {
        project.set_artifact(*field, Some((*value).to_string()));
    }
    project.updated_at = chrono::Utc::now();
}
