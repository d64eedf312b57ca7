//! Stage definitions: prompt construction and response postprocessing
//!
//! Each stage separates two concerns:
//! - `prompt()`: build the messages sent to the provider from a context payload
//! - `postprocess()`: validate the raw reply and turn it into artifacts
//!
//! The data-model step that precedes generation follows the same shape but
//! is not a pipeline stage, so it lives in [`DataModelStep`].

use ideaforge_llm::Message;
use ideaforge_status::{ArtifactField, StageKind};
use ideaforge_validation::{DocumentRules, ValidationError, validate_document, validate_requirements};

use crate::context::ContextPayload;

/// Invocation purpose for the data-model step
pub const PURPOSE_DATA_MODEL: &str = "data_model";

/// Artifacts produced by a successful stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// Value for the stage's output field
    pub artifact: String,
    /// Supplementary fields written alongside
    pub supplementary: Vec<(ArtifactField, String)>,
}

impl StageOutput {
    fn single(artifact: String) -> Self {
        Self {
            artifact,
            supplementary: Vec::new(),
        }
    }
}

pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn system_prompt(&self) -> &'static str;

    fn prompt(&self, ctx: &ContextPayload) -> String;

    fn postprocess(&self, raw: &str) -> Result<StageOutput, ValidationError>;

    fn messages(&self, ctx: &ContextPayload) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.prompt(ctx)),
        ]
    }
}

/// Stage implementation for a provider-backed stage kind.
///
/// `ProjectGeneration` is driven by the code generator and has none.
pub fn stage_for(kind: StageKind) -> Option<Box<dyn Stage>> {
    match kind {
        StageKind::Requirements => Some(Box::new(RequirementsStage)),
        StageKind::Architecture => Some(Box::new(ArchitectureStage)),
        StageKind::UxDesign => Some(Box::new(UxDesignStage)),
        StageKind::ProjectGeneration => None,
    }
}

pub struct RequirementsStage;

const ANALYST_SYSTEM: &str = "You are a senior business analyst with deep experience in \
requirements engineering and user story writing. Analyze only what the user wrote. Do not \
invent a domain or features that the requirements do not support. Simple projects are \
acceptable; ask for clarification only when the input gives no usable idea of the problem, \
the users, or the functionality.";

impl Stage for RequirementsStage {
    fn kind(&self) -> StageKind {
        StageKind::Requirements
    }

    fn system_prompt(&self) -> &'static str {
        ANALYST_SYSTEM
    }

    fn prompt(&self, ctx: &ContextPayload) -> String {
        format!(
            r#"{context}
Assess whether the requirements above are sufficient to analyze, then refine them.

Respond with ONLY one JSON object in exactly this shape:
{{
  "sufficient": true,
  "guidance": "",
  "refined_requirements": "markdown document",
  "user_stories": [
    {{
      "id": "US-001",
      "title": "Story title",
      "description": "As a <user>, I want <goal> so that <benefit>",
      "acceptance_criteria": ["criterion 1", "criterion 2"],
      "priority": "High",
      "business_value": "Why this matters",
      "story_points": 3
    }}
  ]
}}

If the requirements are insufficient, set "sufficient" to false, leave
"refined_requirements" empty and put 3 to 5 specific questions in "guidance".

The refined requirements document must contain: Executive Summary, Core Problem,
Functional Requirements, Non-Functional Requirements, Assumptions and Success Metrics.
"#,
            context = ctx.render()
        )
    }

    fn postprocess(&self, raw: &str) -> Result<StageOutput, ValidationError> {
        let analysis = validate_requirements(raw)?;
        // Always written, so a rerun without stories clears the previous set.
        let stories = serde_json::to_string_pretty(&analysis.user_stories).map_err(|e| {
            ValidationError::Unparsable {
                reason: format!("user stories could not be re-encoded: {e}"),
            }
        })?;
        let mut output = StageOutput::single(analysis.refined_requirements);
        output
            .supplementary
            .push((ArtifactField::UserStories, stories));
        Ok(output)
    }
}

pub struct ArchitectureStage;

const ARCHITECT_SYSTEM: &str = "You are a senior software architect. You design practical, \
implementable systems and document them in clear markdown. Output the document itself, \
never a description of it.";

impl Stage for ArchitectureStage {
    fn kind(&self) -> StageKind {
        StageKind::Architecture
    }

    fn system_prompt(&self) -> &'static str {
        ARCHITECT_SYSTEM
    }

    fn prompt(&self, ctx: &ContextPayload) -> String {
        format!(
            "{context}
Write the system architecture for this project as a markdown document with these sections:

# System Architecture
## Executive Summary
## Components
## API Design
## Data Flow
## Technology Considerations
## Security Considerations
## Implementation Plan

Start directly with the heading. Do not add commentary before or after the document.
",
            context = ctx.render()
        )
    }

    fn postprocess(&self, raw: &str) -> Result<StageOutput, ValidationError> {
        validate_document(raw, DocumentRules::ARCHITECTURE).map(StageOutput::single)
    }
}

pub struct UxDesignStage;

const DESIGNER_SYSTEM: &str = "You are a senior UX designer. You turn requirements and an \
architecture into concrete screens, flows and interaction rules. Output the document \
itself in markdown, never a description of it.";

impl Stage for UxDesignStage {
    fn kind(&self) -> StageKind {
        StageKind::UxDesign
    }

    fn system_prompt(&self) -> &'static str {
        DESIGNER_SYSTEM
    }

    fn prompt(&self, ctx: &ContextPayload) -> String {
        format!(
            "{context}
Write the UX design specification as a markdown document with these sections:

# UX Design
## User Personas
## Key User Flows
## Screens and Layout
## Components
## Accessibility
## Visual Style

Start directly with the heading. Do not add commentary before or after the document.
",
            context = ctx.render()
        )
    }

    fn postprocess(&self, raw: &str) -> Result<StageOutput, ValidationError> {
        validate_document(raw, DocumentRules::UX_DESIGN).map(StageOutput::single)
    }
}

/// Drafts the data model written before project generation
pub struct DataModelStep;

const MODELER_SYSTEM: &str = "You are a senior data modeler. You derive entities, fields \
and relationships from requirements and an architecture, and document them in markdown.";

impl DataModelStep {
    pub fn messages(ctx: &ContextPayload) -> Vec<Message> {
        vec![
            Message::system(MODELER_SYSTEM),
            Message::user(format!(
                "{context}
Write the data model as a markdown document with these sections:

# Data Model
## Entities
## Relationships
## Schema

List each entity's fields with types and constraints. Start directly with the heading.
",
                context = ctx.render()
            )),
        ]
    }

    pub fn postprocess(raw: &str) -> Result<String, ValidationError> {
        validate_document(raw, DocumentRules::DATA_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaforge_status::Project;
    use ideaforge_utils::error::MalformedKind;

    fn ctx(stage: StageKind) -> ContextPayload {
        let mut p = Project::new("1", "Todo", "Build a todo app", "anthropic");
        p.refined_requirements = Some("Refined todo requirements".into());
        p.architecture = Some("Todo architecture".into());
        ContextPayload::for_stage(&p, stage)
    }

    #[test]
    fn test_stage_for_covers_provider_stages() {
        for kind in [StageKind::Requirements, StageKind::Architecture, StageKind::UxDesign] {
            assert_eq!(stage_for(kind).unwrap().kind(), kind);
        }
        assert!(stage_for(StageKind::ProjectGeneration).is_none());
    }

    #[test]
    fn test_prompts_embed_context() {
        let stage = ArchitectureStage;
        let messages = stage.messages(&ctx(StageKind::Architecture));
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Refined todo requirements"));
        assert!(!messages[1].content.contains("Todo architecture"));

        let prompt = RequirementsStage.prompt(&ctx(StageKind::Requirements));
        assert!(prompt.contains("\"sufficient\": true"));
        assert!(!prompt.contains("Refined todo requirements"));
    }

    #[test]
    fn test_requirements_postprocess_emits_user_stories() {
        let raw = r#"{"sufficient": true, "refined_requirements": "Todo list for one user.",
            "user_stories": [{"id": "US-001", "title": "Add", "description": "As a user...",
            "acceptance_criteria": ["shown"], "priority": "High", "business_value": "core",
            "story_points": 2}]}"#;
        let output = RequirementsStage.postprocess(raw).unwrap();
        assert_eq!(output.artifact, "Todo list for one user.");
        assert_eq!(output.supplementary.len(), 1);
        assert_eq!(output.supplementary[0].0, ArtifactField::UserStories);
        assert!(output.supplementary[0].1.contains("US-001"));
    }

    #[test]
    fn test_requirements_without_stories_still_writes_the_field() {
        let raw = r#"{"sufficient": true, "refined_requirements": "New refined"}"#;
        let output = RequirementsStage.postprocess(raw).unwrap();
        assert_eq!(
            output.supplementary,
            vec![(ArtifactField::UserStories, "[]".to_string())]
        );
    }

    #[test]
    fn test_requirements_postprocess_insufficient() {
        let err = RequirementsStage
            .postprocess(r#"{"sufficient": false, "guidance": "Who uses it?"}"#)
            .unwrap_err();
        assert_eq!(err.kind(), MalformedKind::InsufficientInput);
    }

    #[test]
    fn test_document_stages_validate() {
        let doc = "# UX Design\n\n## Screens\n- Task list\n- Task detail";
        assert_eq!(UxDesignStage.postprocess(doc).unwrap().artifact, doc);
        assert!(UxDesignStage.postprocess("Sure! Here it is.").is_err());
        assert!(DataModelStep::postprocess("# Data Model\n\n## Entities\n- Task").is_ok());
    }
}
