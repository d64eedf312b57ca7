//! Canned provider used by `--dry-run`
//!
//! Answers every call the pipeline makes with a well-formed reply, keyed by
//! invocation purpose, so the whole flow can run offline.

use std::sync::LazyLock;

use regex::Regex;

use ideaforge_llm::{LlmError, LlmInvocation, ScriptedBackend};

use crate::codegen::FILE_PURPOSE_PREFIX;
use crate::resolver::PURPOSE_STACK_SELECTION;
use crate::stages::PURPOSE_DATA_MODEL;

static FIRST_LISTED_STACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^- `([A-Za-z0-9_\-]+)`").unwrap());

static PROJECT_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# Project: (.+)$").unwrap());

pub fn dry_run_backend() -> ScriptedBackend {
    ScriptedBackend::new(respond).with_name("dry-run")
}

fn respond(inv: &LlmInvocation) -> Result<String, LlmError> {
    let prompt = inv.user_text();
    let project = PROJECT_HEADING
        .captures(&prompt)
        .map_or("the project", |c| c.get(1).map_or("the project", |m| m.as_str()))
        .trim()
        .to_string();

    let reply = match inv.purpose.as_str() {
        "requirements" => requirements_reply(&project),
        "architecture" => format!(
            "# System Architecture\n\n## Executive Summary\n\nDry-run architecture for {project}.\n\n\
             ## Components\n\n- Client\n- API service\n- Storage\n\n## Data Flow\n\n\
             Client requests go through the API service to storage.\n"
        ),
        "ux_design" => format!(
            "# UX Design\n\n## Key User Flows\n\n- Open {project} and see the main list\n\n\
             ## Screens and Layout\n\n- Home\n- Detail\n"
        ),
        PURPOSE_DATA_MODEL => "# Data Model\n\n## Entities\n\n- Item(id: uuid, title: text)\n\n\
             ## Relationships\n\nNone.\n"
            .to_string(),
        PURPOSE_STACK_SELECTION => {
            let id = FIRST_LISTED_STACK
                .captures(&prompt)
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());
            format!("{{\"selectedStackId\": \"{id}\"}}")
        }
        purpose => match purpose.strip_prefix(FILE_PURPOSE_PREFIX) {
            Some(path) => placeholder_file(path),
            None => {
                return Err(LlmError::Unsupported(format!(
                    "dry run has no reply for '{purpose}'"
                )));
            }
        },
    };
    Ok(reply)
}

fn requirements_reply(project: &str) -> String {
    let refined = format!(
        "# Refined Requirements\n\n## Executive Summary\n\nDry-run analysis of {project}.\n\n\
         ## Functional Requirements\n\n- Users can create, view and delete items\n"
    );
    serde_json::json!({
        "sufficient": true,
        "guidance": "",
        "refined_requirements": refined,
        "user_stories": [{
            "id": "US-001",
            "title": "Create an item",
            "description": "As a user, I want to create an item so that I can track it",
            "acceptance_criteria": ["The new item appears in the list"],
            "priority": "High",
            "business_value": "Core workflow",
            "story_points": 2
        }]
    })
    .to_string()
}

fn placeholder_file(path: &str) -> String {
    let extension = path.rsplit_once('.').map_or("", |(_, ext)| ext);
    let body = match extension {
        "json" => "{\n  \"name\": \"dry-run\",\n  \"version\": \"0.1.0\",\n  \"private\": true\n}".to_string(),
        "txt" | "py" | "sh" | "ps1" | "yml" | "yaml" | "toml" => format!("# {path} (dry run)"),
        "html" | "vue" => format!("<!-- {path} (dry run) -->"),
        "css" => format!("/* {path} (dry run) */"),
        _ => format!("// {path} (dry run)"),
    };
    format!("```\n{body}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaforge_llm::Message;
    use ideaforge_validation::{extract_code, parse_selected_stack_id, validate_requirements};
    use std::time::Duration;

    fn inv(purpose: &str, prompt: &str) -> LlmInvocation {
        LlmInvocation::new("1", purpose, Duration::from_secs(1), vec![Message::user(prompt)])
    }

    #[test]
    fn test_requirements_reply_validates() {
        let reply = respond(&inv("requirements", "# Project: Todo\n")).unwrap();
        let analysis = validate_requirements(&reply).unwrap();
        assert!(analysis.refined_requirements.contains("Todo"));
        assert_eq!(analysis.user_stories.len(), 1);
    }

    #[test]
    fn test_stack_selection_picks_first_listed() {
        let prompt = "Available stacks:\n- `vue_python`: Vue\n- `react_nodejs`: React\n";
        let reply = respond(&inv(PURPOSE_STACK_SELECTION, prompt)).unwrap();
        assert_eq!(parse_selected_stack_id(&reply).as_deref(), Some("vue_python"));
    }

    #[test]
    fn test_file_placeholders_follow_extension() {
        let json = respond(&inv("file:backend/package.json", "")).unwrap();
        assert!(extract_code(&json).contains("\"dry-run\""));
        let py = respond(&inv("file:main.py", "")).unwrap();
        assert_eq!(extract_code(&py), "# main.py (dry run)\n");
    }

    #[test]
    fn test_unknown_purpose_is_unsupported() {
        assert!(matches!(
            respond(&inv("poetry", "")),
            Err(LlmError::Unsupported(_))
        ));
    }
}
