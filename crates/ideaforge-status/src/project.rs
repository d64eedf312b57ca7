//! Project record and its artifact fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DRAFT_STATUS;

/// Named artifact slots on a [`Project`].
///
/// Stage artifacts gate the pipeline. `UserStories` and `DataModel` are
/// supplementary and never gate anything.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactField {
    Requirements,
    RefinedRequirements,
    Architecture,
    UxDesign,
    GeneratedPath,
    UserStories,
    DataModel,
}

impl ArtifactField {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A product idea and everything generated from it so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub application_type_id: Option<String>,
    #[serde(default)]
    pub tech_stack_id: Option<String>,
    pub ai_provider: String,
    #[serde(default)]
    pub refined_requirements: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub ux_design: Option<String>,
    #[serde(default)]
    pub generated_path: Option<String>,
    /// JSON array of user stories from the requirements stage
    #[serde(default)]
    pub user_stories: Option<String>,
    #[serde(default)]
    pub data_model: Option<String>,
    pub status: String,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// New project with only `requirements` set
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        requirements: impl Into<String>,
        ai_provider: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            requirements: requirements.into(),
            application_type_id: None,
            tech_stack_id: None,
            ai_provider: ai_provider.into(),
            refined_requirements: None,
            architecture: None,
            ux_design: None,
            generated_path: None,
            user_stories: None,
            data_model: None,
            status: DRAFT_STATUS.to_string(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_application_type(mut self, application_type_id: impl Into<String>) -> Self {
        self.application_type_id = Some(application_type_id.into());
        self
    }

    #[must_use]
    pub fn with_tech_stack(mut self, tech_stack_id: impl Into<String>) -> Self {
        self.tech_stack_id = Some(tech_stack_id.into());
        self
    }

    /// Artifact text, or `None` when the slot is absent or blank
    pub fn artifact(&self, field: ArtifactField) -> Option<&str> {
        let value = match field {
            ArtifactField::Requirements => Some(self.requirements.as_str()),
            ArtifactField::RefinedRequirements => self.refined_requirements.as_deref(),
            ArtifactField::Architecture => self.architecture.as_deref(),
            ArtifactField::UxDesign => self.ux_design.as_deref(),
            ArtifactField::GeneratedPath => self.generated_path.as_deref(),
            ArtifactField::UserStories => self.user_stories.as_deref(),
            ArtifactField::DataModel => self.data_model.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    pub fn has_artifact(&self, field: ArtifactField) -> bool {
        self.artifact(field).is_some()
    }

    /// Replace one artifact slot. `None` clears optional slots.
    pub fn set_artifact(&mut self, field: ArtifactField, value: Option<String>) {
        match field {
            ArtifactField::Requirements => self.requirements = value.unwrap_or_default(),
            ArtifactField::RefinedRequirements => self.refined_requirements = value,
            ArtifactField::Architecture => self.architecture = value,
            ArtifactField::UxDesign => self.ux_design = value,
            ArtifactField::GeneratedPath => self.generated_path = value,
            ArtifactField::UserStories => self.user_stories = value,
            ArtifactField::DataModel => self.data_model = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_project_has_only_requirements() {
        let project = Project::new("1", "Todo", "Build a todo app", "anthropic");
        assert_eq!(project.status, "draft");
        assert_eq!(project.artifact(ArtifactField::Requirements), Some("Build a todo app"));
        for field in [
            ArtifactField::RefinedRequirements,
            ArtifactField::Architecture,
            ArtifactField::UxDesign,
            ArtifactField::GeneratedPath,
            ArtifactField::UserStories,
            ArtifactField::DataModel,
        ] {
            assert!(!project.has_artifact(field), "{field} should be absent");
        }
    }

    #[test]
    fn test_blank_artifact_counts_as_absent() {
        let mut project = Project::new("1", "Todo", "x", "anthropic");
        project.set_artifact(ArtifactField::Architecture, Some("  \n".into()));
        assert!(!project.has_artifact(ArtifactField::Architecture));
        project.set_artifact(ArtifactField::Architecture, Some("# Arch".into()));
        assert_eq!(project.artifact(ArtifactField::Architecture), Some("# Arch"));
    }

    #[test]
    fn test_field_names_round_trip_through_strum() {
        assert_eq!(ArtifactField::UxDesign.as_str(), "ux_design");
        assert_eq!(
            ArtifactField::from_str("refined_requirements").unwrap(),
            ArtifactField::RefinedRequirements
        );
    }

    #[test]
    fn test_deserializes_sparse_record() {
        let json = serde_json::json!({
            "id": "3",
            "name": "Guitar site",
            "requirements": "Show lessons",
            "ai_provider": "openai",
            "status": "draft",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        });
        let project: Project = serde_json::from_value(json).unwrap();
        assert!(project.architecture.is_none());
        assert!(!project.archived);
    }
}
