//! JSON file store used by the CLI
//!
//! All projects live in one JSON document. Every operation takes an
//! exclusive `fd-lock` on a sidecar `.lock` file, reads the document,
//! applies one change and writes the document back atomically, so separate
//! processes sharing the file serialize cleanly.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};

use camino::{Utf8Path, Utf8PathBuf};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ideaforge_status::{ArtifactField, Project};
use ideaforge_utils::atomic_write::write_file_atomic;
use ideaforge_utils::error::PipelineError;

use super::{ArtifactStore, NewProject, apply_artifacts};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    projects: BTreeMap<String, Project>,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn lock_path(&self) -> Utf8PathBuf {
        let mut name = self.path.file_name().unwrap_or("projects.json").to_string();
        name.push_str(".lock");
        self.path.with_file_name(name)
    }

    /// Run `f` against the document under an exclusive file lock.
    ///
    /// The document is written back only when `f` reports a change.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<(T, bool), PipelineError>,
    ) -> Result<T, PipelineError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Store(format!("Failed to create store directory {parent}: {e}"))
            })?;
        }

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| PipelineError::Store(format!("Failed to open {lock_path}: {e}")))?;
        let mut rw_lock = RwLock::new(lock_file);
        let _guard = rw_lock
            .write()
            .map_err(|e| PipelineError::Store(format!("Failed to lock {lock_path}: {e}")))?;

        let mut document = self.read_document()?;
        let (value, changed) = f(&mut document)?;
        if changed {
            let json = serde_json::to_string_pretty(&document)
                .map_err(|e| PipelineError::Store(format!("Failed to serialize store: {e}")))?;
            write_file_atomic(&self.path, &json)
                .map_err(|e| PipelineError::Store(format!("{e:#}")))?;
            debug!(path = %self.path, "Store document written");
        }
        Ok(value)
    }

    fn read_document(&self) -> Result<StoreDocument, PipelineError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(StoreDocument::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                PipelineError::Store(format!("Store file {} is corrupt: {e}", self.path))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(PipelineError::Store(format!(
                "Failed to read {}: {e}",
                self.path
            ))),
        }
    }
}

fn not_found(id: &str) -> PipelineError {
    PipelineError::ProjectNotFound { id: id.to_string() }
}

impl ArtifactStore for JsonFileStore {
    fn load_project(&self, id: &str) -> Result<Project, PipelineError> {
        self.with_document(|doc| {
            let project = doc.projects.get(id).cloned().ok_or_else(|| not_found(id))?;
            Ok((project, false))
        })
    }

    fn save_artifacts(
        &self,
        id: &str,
        fields: &[(ArtifactField, &str)],
    ) -> Result<(), PipelineError> {
        self.with_document(|doc| {
            let project = doc.projects.get_mut(id).ok_or_else(|| not_found(id))?;
            apply_artifacts(project, fields);
            Ok(((), true))
        })
    }

    fn save_status(&self, id: &str, status: &str) -> Result<(), PipelineError> {
        self.with_document(|doc| {
            let project = doc.projects.get_mut(id).ok_or_else(|| not_found(id))?;
            let changed = project.status != status;
            project.status = status.to_string();
            Ok(((), changed))
        })
    }

    fn create_project(&self, draft: NewProject) -> Result<Project, PipelineError> {
        self.with_document(|doc| {
            let highest = doc
                .projects
                .keys()
                .filter_map(|k| k.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            doc.next_id = doc.next_id.max(highest) + 1;
            let project = draft.into_project(doc.next_id.to_string());
            doc.projects.insert(project.id.clone(), project.clone());
            Ok((project, true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(".ideaforge/projects.json")).unwrap();
        (dir, JsonFileStore::new(path))
    }

    fn draft() -> NewProject {
        NewProject {
            name: "Guitar Site".into(),
            requirements: "Show lessons".into(),
            ai_provider: "anthropic".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_persists_across_instances() {
        let (_dir, store) = store();
        let created = store.create_project(draft()).unwrap();
        assert_eq!(created.id, "1");

        let reopened = JsonFileStore::new(store.path().to_owned());
        let loaded = reopened.load_project("1").unwrap();
        assert_eq!(loaded.name, "Guitar Site");
        assert_eq!(reopened.create_project(draft()).unwrap().id, "2");
    }

    #[test]
    fn test_save_artifact_round_trip() {
        let (_dir, store) = store();
        let project = store.create_project(draft()).unwrap();
        store
            .save_artifact(&project.id, ArtifactField::RefinedRequirements, "# Refined")
            .unwrap();
        store.save_status(&project.id, "Requirements Complete").unwrap();

        let loaded = store.load_project(&project.id).unwrap();
        assert_eq!(loaded.refined_requirements.as_deref(), Some("# Refined"));
        assert_eq!(loaded.status, "Requirements Complete");
        assert!(loaded.architecture.is_none());
    }

    #[test]
    fn test_save_artifacts_is_one_document_write() {
        let (_dir, store) = store();
        let project = store.create_project(draft()).unwrap();
        store
            .save_artifacts(
                &project.id,
                &[
                    (ArtifactField::DataModel, "# Data Model"),
                    (ArtifactField::GeneratedPath, "projects/1_guitar_site"),
                ],
            )
            .unwrap();

        let loaded = JsonFileStore::new(store.path().to_owned())
            .load_project(&project.id)
            .unwrap();
        assert_eq!(loaded.data_model.as_deref(), Some("# Data Model"));
        assert_eq!(loaded.generated_path.as_deref(), Some("projects/1_guitar_site"));
        assert!(store.save_artifacts("9", &[(ArtifactField::DataModel, "x")]).is_err());
    }

    #[test]
    fn test_missing_file_means_empty_store() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load_project("1"),
            Err(PipelineError::ProjectNotFound { .. })
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_store_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load_project("1"), Err(PipelineError::Store(_))));
    }

    #[test]
    fn test_lock_file_sits_next_to_store() {
        let (_dir, store) = store();
        assert_eq!(store.lock_path().file_name(), Some("projects.json.lock"));
    }
}
