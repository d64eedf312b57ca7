//! Stage state machine for ideaforge projects
//!
//! Stage availability and project status are derived purely from which
//! artifact fields are non-empty. Nothing here stores a current-stage
//! pointer, so the derived view can never drift from the stored artifacts.

mod project;
mod stage;

pub use project::{ArtifactField, Project};
pub use stage::{STAGES, StageDescriptor, StageKind};

use ideaforge_utils::error::PipelineError;
use serde::Serialize;

/// Status of a project with no completed stage
pub const DRAFT_STATUS: &str = "draft";

/// Derived view of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageState {
    pub stage: StageKind,
    pub available: bool,
    pub completed: bool,
}

/// Availability and completion for every stage, in stage order
pub fn stage_status(project: &Project) -> Vec<StageState> {
    STAGES
        .iter()
        .map(|d| StageState {
            stage: d.kind,
            available: project.has_artifact(d.prerequisite),
            completed: project.has_artifact(d.output),
        })
        .collect()
}

/// Human-readable label for the furthest completed stage
pub fn derive_status(project: &Project) -> &'static str {
    STAGES
        .iter()
        .rev()
        .find(|d| project.has_artifact(d.output))
        .map_or(DRAFT_STATUS, |d| d.completed_label)
}

/// Whether `stage` may run now. Completed stages may always run again.
pub fn can_advance(project: &Project, stage: StageKind) -> bool {
    project.has_artifact(stage.descriptor().prerequisite)
}

/// Reject a stage whose prerequisite artifact is empty
///
/// # Errors
///
/// Returns `PipelineError::StagePrerequisiteNotMet` naming the missing field.
pub fn ensure_can_advance(project: &Project, stage: StageKind) -> Result<(), PipelineError> {
    if can_advance(project, stage) {
        Ok(())
    } else {
        Err(PipelineError::StagePrerequisiteNotMet {
            stage: stage.as_str().to_string(),
            missing: stage.descriptor().prerequisite.as_str().to_string(),
        })
    }
}
