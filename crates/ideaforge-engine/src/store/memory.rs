use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use ideaforge_status::{ArtifactField, Project};
use ideaforge_utils::error::PipelineError;

use super::{ArtifactStore, NewProject, apply_artifacts};

/// Process-local store, used by tests and embedders
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    projects: BTreeMap<String, Project>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed record, replacing any with the same id
    pub fn insert(&self, project: Project) {
        let mut inner = self.lock();
        if let Ok(numeric) = project.id.parse::<u64>() {
            inner.next_id = inner.next_id.max(numeric);
        }
        inner.projects.insert(project.id.clone(), project);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn load_project(&self, id: &str) -> Result<Project, PipelineError> {
        self.lock()
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::ProjectNotFound { id: id.to_string() })
    }

    fn save_artifacts(
        &self,
        id: &str,
        fields: &[(ArtifactField, &str)],
    ) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| PipelineError::ProjectNotFound { id: id.to_string() })?;
        apply_artifacts(project, fields);
        Ok(())
    }

    fn save_status(&self, id: &str, status: &str) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| PipelineError::ProjectNotFound { id: id.to_string() })?;
        project.status = status.to_string();
        Ok(())
    }

    fn create_project(&self, draft: NewProject) -> Result<Project, PipelineError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let project = draft.into_project(inner.next_id.to_string());
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }
}
