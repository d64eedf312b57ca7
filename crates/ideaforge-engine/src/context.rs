//! Context payloads handed to the provider for each stage
//!
//! A payload only ever carries artifacts that earlier stages produced.
//! Nothing from the stage being run or a later stage leaks into it.

use ideaforge_status::{ArtifactField, Project, StageKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPayload {
    pub project_name: String,
    pub description: String,
    pub requirements: String,
    pub refined_requirements: Option<String>,
    pub architecture: Option<String>,
    pub ux_design: Option<String>,
}

impl ContextPayload {
    /// Payload for `stage`, built from the project's approved artifacts
    pub fn for_stage(project: &Project, stage: StageKind) -> Self {
        let take = |field: ArtifactField, needed_from: StageKind| {
            if stage > needed_from {
                project.artifact(field).map(str::to_string)
            } else {
                None
            }
        };

        Self {
            project_name: project.name.clone(),
            description: project.description.clone(),
            requirements: project.requirements.clone(),
            refined_requirements: take(ArtifactField::RefinedRequirements, StageKind::Requirements),
            architecture: take(ArtifactField::Architecture, StageKind::Architecture),
            ux_design: take(ArtifactField::UxDesign, StageKind::UxDesign),
        }
    }

    /// Markdown rendering used inside prompts
    pub fn render(&self) -> String {
        let mut out = format!("# Project: {}\n", self.project_name);
        if !self.description.trim().is_empty() {
            out.push_str(&format!("\n## Description\n\n{}\n", self.description.trim()));
        }
        out.push_str(&format!("\n## Original Requirements\n\n{}\n", self.requirements.trim()));

        let sections = [
            ("Refined Requirements", &self.refined_requirements),
            ("System Architecture", &self.architecture),
            ("UX Design", &self.ux_design),
        ];
        for (title, value) in sections {
            if let Some(text) = value {
                out.push_str(&format!("\n## {title}\n\n{}\n", text.trim()));
            }
        }
        out
    }
}
